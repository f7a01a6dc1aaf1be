//! Published document entries.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::error::{AppError, Result};
use crate::models::Category;

/// Display and storage format of a publication timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M UTC";

/// One document entry from a category's listing.
///
/// Identity is the triple `(published_at, title, href)`. The category is
/// carried along for context only; logs are kept per category.
#[derive(Debug, Clone)]
pub struct Item {
    pub category: Category,
    pub published_at: DateTime<Utc>,
    pub title: String,
    pub href: String,
}

impl Item {
    /// Create an item, truncating the timestamp to whole minutes.
    pub fn new(
        category: Category,
        published_at: DateTime<Utc>,
        title: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        Self {
            category,
            published_at: truncate_to_minute(published_at),
            title: title.into(),
            href: href.into(),
        }
    }

    /// Timestamp rendered as `YYYY/MM/DD HH:MM UTC`.
    pub fn published_label(&self) -> String {
        format_timestamp(&self.published_at)
    }

    /// Identity key used for dedup against the log.
    pub fn identity(&self) -> (DateTime<Utc>, &str, &str) {
        (self.published_at, &self.title, &self.href)
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Format a UTC timestamp as `YYYY/MM/DD HH:MM UTC`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `YYYY/MM/DD HH:MM UTC` timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::validation(format!("invalid timestamp '{s}': {e}")))
}

fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

//! Durable announcement logs.
//!
//! Every category owns one log: the ordered list of items that were
//! successfully published, oldest first. The log is the only record of
//! what has already been announced.
//!
//! ## Directory Structure
//!
//! ```text
//! logs/
//! ├── log_F1.json
//! ├── log_F2.json
//! └── log_F3.json
//! ```

pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Category, Item, format_timestamp, parse_timestamp};

// Re-export for convenience
pub use local::LocalLog;

/// On-disk shape of one logged item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// `YYYY/MM/DD HH:MM UTC`
    pub date: String,
    pub title: String,
    pub href: String,
}

impl From<&Item> for LogRecord {
    fn from(item: &Item) -> Self {
        Self {
            date: format_timestamp(&item.published_at),
            title: item.title.clone(),
            href: item.href.clone(),
        }
    }
}

impl LogRecord {
    /// Convert back into an item of the given category.
    pub fn into_item(self, category: Category) -> Result<Item> {
        let published_at = parse_timestamp(&self.date)?;
        Ok(Item::new(category, published_at, self.title, self.href))
    }
}

/// Trait for announcement log backends.
#[async_trait]
pub trait ItemLog: Send + Sync {
    /// Load every logged item, oldest first.
    ///
    /// A category that has never been logged yields an empty list.
    async fn load_all(&self, category: Category) -> Result<Vec<Item>>;

    /// Replace the whole log in one atomic write.
    async fn save_all(&self, category: Category, items: &[Item]) -> Result<()>;

    /// Append one item. Must be durable before returning.
    ///
    /// Appending an item that is already logged is a no-op.
    async fn append(&self, category: Category, item: &Item) -> Result<()> {
        let mut items = self.load_all(category).await?;
        if items.contains(item) {
            log::debug!("{} already logged for {}", item.title, category);
            return Ok(());
        }
        items.push(item.clone());
        self.save_all(category, &items).await
    }

    /// Whether the item has already been logged.
    async fn contains(&self, category: Category, item: &Item) -> Result<bool> {
        Ok(self.load_all(category).await?.contains(item))
    }
}

//! Championship categories and their static metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A championship whose documents are announced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    F1,
    F2,
    F3,
}

impl Category {
    /// All known categories in announcement order.
    pub const ALL: [Category; 3] = [Category::F1, Category::F2, Category::F3];

    /// Stable key used in file names and messages.
    pub fn key(&self) -> &'static str {
        match self {
            Category::F1 => "F1",
            Category::F2 => "F2",
            Category::F3 => "F3",
        }
    }

    /// File name of this category's announcement log.
    pub fn log_file_name(&self) -> String {
        format!("log_{}.json", self.key())
    }

    /// Built-in configuration for this category.
    pub fn default_config(&self) -> CategoryConfig {
        let (listing_url, hashtags) = match self {
            Category::F1 => (
                "https://www.fia.com/documents/championships/fia-formula-one-world-championship-14",
                "#Formula1 #F1",
            ),
            Category::F2 => (
                "https://www.fia.com/documents/championships/championships/formula-2-championship-44",
                "#Formula2 #F2",
            ),
            Category::F3 => (
                "https://www.fia.com/documents/championships/fia-formula-3-championship-1012",
                "#Formula3 #F3",
            ),
        };

        CategoryConfig {
            category: *self,
            listing_url: listing_url.to_string(),
            title_prefix: format!("NEW {} DOC", self.key()),
            hashtags: hashtags.to_string(),
            enabled: true,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("unknown category '{s}'")))
    }
}

/// Static per-category metadata, read once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Which championship this entry configures
    pub category: Category,

    /// Championship documents page
    pub listing_url: String,

    /// First line of every announcement
    pub title_prefix: String,

    /// Category-specific hashtags
    pub hashtags: String,

    /// Whether runs include this category
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

//! Race weekend hashtags from a static JSON mapping.
//!
//! ```json
//! { "Monaco Grand Prix": "#MonacoGP", "Miami Grand Prix": "#MiamiGP" }
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::services::HashtagLookup;

/// Event title to hashtag mapping, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct HashtagMap {
    tags: HashMap<String, String>,
}

impl HashtagMap {
    pub fn new(tags: HashMap<String, String>) -> Self {
        Self { tags }
    }

    /// Load the mapping from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&content)?))
    }

    /// Load the mapping or fall back to an empty one.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Hashtag map load failed from {:?}: {}. Race hashtags disabled.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl HashtagLookup for HashtagMap {
    fn hashtags_for(&self, event_title: &str) -> Option<String> {
        let title = event_title.trim();
        self.tags
            .get(title)
            .or_else(|| {
                self.tags
                    .iter()
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case(title))
                    .map(|(_, v)| v)
            })
            .cloned()
    }
}

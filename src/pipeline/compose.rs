//! Announcement text.

use crate::models::{CategoryConfig, Item};

/// Join race, category and common hashtags into one line.
///
/// Empty parts are skipped so the result never carries stray spaces.
pub fn build_hashtags(race: &str, category: &CategoryConfig, common: &str) -> String {
    [race, category.hashtags.as_str(), common]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the post for a new document.
///
/// ```text
/// NEW F1 DOC
///
/// Decision - Car 1 - Unsafe release
///
/// Published at: 2024/05/01 10:00 UTC
///
/// https://www.fia.com/...
///
/// #MonacoGP #Formula1 #F1 #FIA #GrandPrix
/// ```
pub fn compose(item: &Item, category: &CategoryConfig, hashtags: &str) -> String {
    let mut sections = vec![
        category.title_prefix.trim().to_string(),
        item.title.trim().to_string(),
        format!("Published at: {}", item.published_label()),
        item.href.clone(),
        hashtags.trim().to_string(),
    ];
    sections.retain(|s| !s.is_empty());
    sections.join("\n\n")
}

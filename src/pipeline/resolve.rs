//! New item resolution.
//!
//! Compares the current listing against the announcement log and returns
//! every listed item that has not been announced yet, oldest first.
//!
//! Membership is set containment on the item identity. There is no
//! "stop at the first known item" cutoff: the remote page is not trusted to
//! be strictly chronological, and backfilled or reordered documents must
//! still be picked up.

use std::collections::HashSet;

use crate::models::Item;

/// Items in `listing` that are absent from `log`, in publication order.
///
/// `listing` is expected newest-first as returned by the remote page. Items
/// sharing a timestamp keep the page's bottom-to-top order. Duplicate rows
/// within the listing are reported once.
pub fn resolve_new_items(listing: &[Item], log: &[Item]) -> Vec<Item> {
    let logged: HashSet<&Item> = log.iter().collect();
    let mut seen: HashSet<&Item> = HashSet::new();

    let mut new_items: Vec<Item> = listing
        .iter()
        .rev()
        .filter(|item| !logged.contains(item) && seen.insert(*item))
        .cloned()
        .collect();

    // Stable, so equal timestamps stay in reversed listing order.
    new_items.sort_by_key(|item| item.published_at);
    new_items
}

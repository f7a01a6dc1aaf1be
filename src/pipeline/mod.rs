//! Announcement pipeline.
//!
//! - `resolve`: which listed items are new, in publication order
//! - `compose`: post text and hashtag line
//! - `publish`: per-category run that ties fetch, render, publish and log together

pub mod compose;
pub mod publish;
pub mod resolve;

pub use compose::{build_hashtags, compose};
pub use publish::{Collaborators, ItemOutcome, ItemStatus, PublishPipeline, RunReport};
pub use resolve::resolve_new_items;

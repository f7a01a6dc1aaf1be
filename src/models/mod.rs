// src/models/mod.rs

//! Domain models for the announcement bot.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod category;
mod config;
mod item;

// Re-export all public types
pub use category::{Category, CategoryConfig};
pub use config::{
    Config, FetcherConfig, NotifierConfig, NotifierKind, PathsConfig, PublisherConfig,
    PublisherKind, RenderConfig,
};
pub use item::{Item, TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};

/// Current contents of a category's documents page.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Name of the race weekend the documents belong to
    pub event_title: Option<String>,
    /// Documents, newest first as shown on the page
    pub items: Vec<Item>,
}

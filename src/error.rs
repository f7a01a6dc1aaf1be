// src/error.rs

//! Unified error handling for the announcement bot.

use std::fmt;

use thiserror::Error;

/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Listing could not be fetched or parsed
    #[error("Fetch error for {category}: {message}")]
    Fetch { category: String, message: String },

    /// Preview rendering failed
    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    /// Social post could not be published
    #[error("Publish error for {category}: {message}")]
    Publish { category: String, message: String },

    /// Announcement log could not be read or written
    #[error("Log error for {category}: {message}")]
    Log { category: String, message: String },

    /// Run lock could not be acquired or released
    #[error("Lock error: {0}")]
    Lock(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a fetch error for a category.
    pub fn fetch(category: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            category: category.into(),
            message: message.to_string(),
        }
    }

    /// Create a render error for a document.
    pub fn render(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a publish error for a category.
    pub fn publish(category: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Publish {
            category: category.into(),
            message: message.to_string(),
        }
    }

    /// Create a log error for a category.
    pub fn log(category: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Log {
            category: category.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error ends a whole category run (as opposed to one item).
    ///
    /// Render and publish failures are contained per item; everything else
    /// that reaches the caller means the category did not complete.
    pub fn is_category_fatal(&self) -> bool {
        !matches!(self, Self::Render { .. } | Self::Publish { .. })
    }
}

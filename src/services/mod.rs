//! External collaborators of the announcement pipeline.
//!
//! The pipeline only talks to these traits; concrete implementations for
//! the FIA site, `pdftoppm`, Mastodon, SMTP and a lock file live in the
//! submodules.

pub mod hashtags;
pub mod listing;
pub mod lock;
pub mod notify;
pub mod publish;
pub mod render;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CategoryConfig, Listing};

pub use hashtags::HashtagMap;
pub use listing::FiaListingFetcher;
pub use lock::{FileRunLock, RunGuard};
#[cfg(feature = "email")]
pub use notify::EmailNotifier;
pub use notify::LogNotifier;
pub use publish::{DryRunPublisher, MastodonPublisher};
pub use render::PdftoppmRenderer;

/// Source of the current document listing for a category.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    /// Fetch the current listing, newest first.
    async fn fetch(&self, category: &CategoryConfig) -> Result<Listing>;
}

/// Turns a document into preview images.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render up to `max_pages` leading pages of the document at `url` into
    /// `workspace`, returning the image paths in page order.
    ///
    /// `workspace` exists and is empty when this is called.
    async fn render_preview(
        &self,
        url: &str,
        workspace: &Path,
        max_pages: usize,
    ) -> Result<Vec<PathBuf>>;
}

/// Acknowledgement of a published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub id: String,
    pub url: Option<String>,
    /// Nothing was actually posted; the item must stay unlogged
    pub dry_run: bool,
}

/// Social media transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a post with optional images.
    async fn publish(&self, text: &str, images: &[PathBuf]) -> Result<PublishReceipt>;
}

/// Out-of-band failure reporting. Best effort: never fails the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_failure(&self, subject: &str, body: &str);
}

/// Process-level guard against overlapping runs.
pub trait RunLock: Send + Sync {
    /// Try to take the lock. `Ok(false)` means another run holds it.
    fn try_acquire(&self, pid: u32) -> Result<bool>;

    /// Give the lock back.
    fn release(&self) -> Result<()>;
}

/// Race weekend hashtags keyed by event title.
pub trait HashtagLookup: Send + Sync {
    fn hashtags_for(&self, event_title: &str) -> Option<String>;
}

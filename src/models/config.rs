//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Category, CategoryConfig};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and listing parsing settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Preview rendering settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Social post transport
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Failure notification transport
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Files and directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Tags appended to every announcement
    #[serde(default = "defaults::common_hashtags")]
    pub common_hashtags: String,

    /// How many categories may run at the same time
    #[serde(default = "defaults::max_concurrent_categories")]
    pub max_concurrent_categories: usize,

    /// Category definitions
    #[serde(default = "defaults::categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, using defaults only when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_if_exists(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("No config at {:?}. Using defaults.", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Configuration entry for a category, if one is defined.
    pub fn category(&self, category: Category) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Categories that take part in a run.
    pub fn enabled_categories(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.categories.iter().filter(|c| c.enabled)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.fetcher.base_url)
            .map_err(|e| AppError::validation(format!("fetcher.base_url: {e}")))?;
        self.fetcher.source_tz()?;
        if self.render.max_pages == 0 {
            return Err(AppError::validation("render.max_pages must be > 0"));
        }
        if self.max_concurrent_categories == 0 {
            return Err(AppError::validation(
                "max_concurrent_categories must be > 0",
            ));
        }
        if self.publisher.kind == PublisherKind::Mastodon {
            url::Url::parse(&self.publisher.instance_url)
                .map_err(|e| AppError::validation(format!("publisher.instance_url: {e}")))?;
        }
        if self.notifier.kind == NotifierKind::Email
            && (self.notifier.host.is_empty()
                || self.notifier.from.is_empty()
                || self.notifier.to.is_empty())
        {
            return Err(AppError::validation(
                "notifier.host, notifier.from and notifier.to are required for email",
            ));
        }
        if self.categories.is_empty() {
            return Err(AppError::validation("No categories defined"));
        }

        let mut seen = HashSet::new();
        for entry in &self.categories {
            if !seen.insert(entry.category) {
                return Err(AppError::validation(format!(
                    "category {} is defined more than once",
                    entry.category
                )));
            }
            url::Url::parse(&entry.listing_url).map_err(|e| {
                AppError::validation(format!("{}: listing_url: {e}", entry.category))
            })?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            render: RenderConfig::default(),
            publisher: PublisherConfig::default(),
            notifier: NotifierConfig::default(),
            paths: PathsConfig::default(),
            common_hashtags: defaults::common_hashtags(),
            max_concurrent_categories: defaults::max_concurrent_categories(),
            categories: defaults::categories(),
        }
    }
}

/// HTTP client and listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Site root that relative document links resolve against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// IANA time zone of the wall-clock times shown on the site
    #[serde(default = "defaults::source_timezone")]
    pub source_timezone: String,
}

impl FetcherConfig {
    /// Parsed `source_timezone`.
    pub fn source_tz(&self) -> Result<Tz> {
        self.source_timezone.parse().map_err(|e| {
            AppError::validation(format!(
                "fetcher.source_timezone '{}': {e}",
                self.source_timezone
            ))
        })
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            base_url: defaults::base_url(),
            source_timezone: defaults::source_timezone(),
        }
    }
}

/// PDF preview rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Scratch directory, one subdirectory per category
    #[serde(default = "defaults::workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Number of leading pages rendered as images
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Path or name of the `pdftoppm` binary
    #[serde(default = "defaults::pdftoppm")]
    pub pdftoppm: String,

    /// Render resolution
    #[serde(default = "defaults::dpi")]
    pub dpi: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workspace_dir: defaults::workspace_dir(),
            max_pages: defaults::max_pages(),
            pdftoppm: defaults::pdftoppm(),
            dpi: defaults::dpi(),
        }
    }
}

/// Which social transport receives announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublisherKind {
    Mastodon,
    DryRun,
}

/// Social post transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "defaults::publisher_kind")]
    pub kind: PublisherKind,

    /// Base URL of the Mastodon instance
    #[serde(default)]
    pub instance_url: String,

    /// Environment variable holding the access token
    #[serde(default = "defaults::access_token_env")]
    pub access_token_env: String,

    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            kind: defaults::publisher_kind(),
            instance_url: String::new(),
            access_token_env: defaults::access_token_env(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Which channel receives failure notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifierKind {
    Log,
    Email,
}

/// Failure notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "defaults::notifier_kind")]
    pub kind: NotifierKind,

    /// SMTP relay host
    #[serde(default)]
    pub host: String,

    /// Environment variable holding the SMTP user
    #[serde(default = "defaults::smtp_user_env")]
    pub username_env: String,

    /// Environment variable holding the SMTP password
    #[serde(default = "defaults::smtp_password_env")]
    pub password_env: String,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: defaults::notifier_kind(),
            host: String::new(),
            username_env: defaults::smtp_user_env(),
            password_env: defaults::smtp_password_env(),
            from: String::new(),
            to: String::new(),
        }
    }
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `log_<CATEGORY>.json`
    #[serde(default = "defaults::log_dir")]
    pub log_dir: PathBuf,

    /// Event title to race hashtag mapping
    #[serde(default = "defaults::hashtags_file")]
    pub hashtags_file: PathBuf,

    /// Marker file guarding against overlapping runs
    #[serde(default = "defaults::lock_file")]
    pub lock_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_dir: defaults::log_dir(),
            hashtags_file: defaults::hashtags_file(),
            lock_file: defaults::lock_file(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{NotifierKind, PublisherKind};
    use crate::models::{Category, CategoryConfig};

    // Fetcher defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; fia-docs/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn base_url() -> String {
        "https://www.fia.com".into()
    }
    pub fn source_timezone() -> String {
        "Europe/Paris".into()
    }

    // Render defaults
    pub fn workspace_dir() -> PathBuf {
        PathBuf::from("tmp")
    }
    pub fn max_pages() -> usize {
        4
    }
    pub fn pdftoppm() -> String {
        "pdftoppm".into()
    }
    pub fn dpi() -> u32 {
        150
    }

    // Transport defaults
    pub fn publisher_kind() -> PublisherKind {
        PublisherKind::DryRun
    }
    pub fn access_token_env() -> String {
        "FIA_DOCS_ACCESS_TOKEN".into()
    }
    pub fn notifier_kind() -> NotifierKind {
        NotifierKind::Log
    }
    pub fn smtp_user_env() -> String {
        "FIA_DOCS_SMTP_USER".into()
    }
    pub fn smtp_password_env() -> String {
        "FIA_DOCS_SMTP_PASSWORD".into()
    }

    // Path defaults
    pub fn log_dir() -> PathBuf {
        PathBuf::from("logs")
    }
    pub fn hashtags_file() -> PathBuf {
        PathBuf::from("raceHashtags.json")
    }
    pub fn lock_file() -> PathBuf {
        PathBuf::from("isRunning.tmp")
    }

    // Announcement defaults
    pub fn common_hashtags() -> String {
        "#FIA #GrandPrix".into()
    }
    pub fn max_concurrent_categories() -> usize {
        1
    }
    pub fn categories() -> Vec<CategoryConfig> {
        Category::ALL.iter().map(Category::default_config).collect()
    }
}

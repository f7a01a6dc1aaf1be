// src/pipeline/publish.rs

//! Per-category announcement run.
//!
//! One run walks a category through: load log, fetch listing, resolve new
//! items, then for every new item in publication order: render preview,
//! compose, publish, append to log.
//!
//! Failure containment:
//!
//! - fetch failure: category aborted before any log write
//! - render failure: item published text-only
//! - publish failure: item skipped and left unlogged, so the next run
//!   resolves it again
//! - log failure: category aborted, remaining items untouched
//!
//! Dry-run receipts are never logged, so a later real run still posts them.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{Category, CategoryConfig, Config, Item};
use crate::pipeline::compose::{build_hashtags, compose};
use crate::pipeline::resolve::resolve_new_items;
use crate::services::{HashtagLookup, ListingFetcher, Notifier, Publisher, Renderer};
use crate::storage::ItemLog;
use crate::utils::fs::reset_dir;

/// Everything the pipeline talks to besides its configuration.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub log: &'a dyn ItemLog,
    pub fetcher: &'a dyn ListingFetcher,
    pub renderer: &'a dyn Renderer,
    pub publisher: &'a dyn Publisher,
    pub notifier: &'a dyn Notifier,
    pub hashtags: &'a dyn HashtagLookup,
}

/// Final state of one new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Published and recorded in the log
    Logged { post_id: String },
    /// Dry-run publisher accepted it; not logged
    DryRun,
    /// Publish failed; left out of the log for the next run
    PublishFailed(String),
}

/// What happened to one new item.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item: Item,
    /// Preview images attached to the post
    pub images: usize,
    /// Why the preview was skipped, if it was
    pub render_error: Option<String>,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_logged(&self) -> bool {
        matches!(self.status, ItemStatus::Logged { .. })
    }
}

/// Summary of one category run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub category: Category,
    pub event_title: Option<String>,
    /// Items on the remote listing
    pub fetched: usize,
    /// Items not yet in the log
    pub new_items: usize,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunReport {
    fn new(category: Category) -> Self {
        Self {
            category,
            event_title: None,
            fetched: 0,
            new_items: 0,
            outcomes: Vec::new(),
        }
    }

    /// Items published and logged.
    pub fn published(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_logged()).count()
    }

    /// Items only shown by the dry-run publisher.
    pub fn dry_run(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == ItemStatus::DryRun)
            .count()
    }

    /// Items whose publish failed.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ItemStatus::PublishFailed(_)))
            .count()
    }

    /// Items posted without preview images.
    pub fn text_only(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, ItemStatus::PublishFailed(_)) && o.images == 0)
            .count()
    }
}

/// Announces new documents for categories.
pub struct PublishPipeline<'a> {
    config: &'a Config,
    deps: Collaborators<'a>,
}

impl<'a> PublishPipeline<'a> {
    pub fn new(config: &'a Config, deps: Collaborators<'a>) -> Self {
        Self { config, deps }
    }

    /// Run every enabled category.
    ///
    /// Categories own disjoint logs and workspaces, so up to
    /// `max_concurrent_categories` of them run at once. Results come back
    /// in category order.
    pub async fn run_all(&self) -> Vec<(Category, Result<RunReport>)> {
        let categories: Vec<&CategoryConfig> = self.config.enabled_categories().collect();
        self.run_categories(&categories).await
    }

    /// Run the given categories.
    pub async fn run_categories(
        &self,
        categories: &[&CategoryConfig],
    ) -> Vec<(Category, Result<RunReport>)> {
        let concurrency = self.config.max_concurrent_categories.max(1);

        let mut results: Vec<_> = stream::iter(categories.iter().copied())
            .map(|category| async move { (category.category, self.run(category).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        results.sort_by_key(|(category, _)| *category);
        results
    }

    /// Run one category.
    ///
    /// Returns an error only for failures that end the whole category
    /// (fetch, log). Per-item failures are recorded in the report.
    pub async fn run(&self, category: &CategoryConfig) -> Result<RunReport> {
        let key = category.category.key();
        let mut report = RunReport::new(category.category);
        log::info!("{key}: checking {}", category.listing_url);

        let logged = match self.deps.log.load_all(category.category).await {
            Ok(logged) => logged,
            Err(e) => {
                let err = as_log_error(key, e);
                self.deps
                    .notifier
                    .notify_failure(&format!("Failed to read log - {key}"), &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let listing = match self.deps.fetcher.fetch(category).await {
            Ok(listing) => listing,
            Err(e) => {
                let err = as_fetch_error(key, e);
                self.deps
                    .notifier
                    .notify_failure(&format!("Failed to fetch documents - {key}"), &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let new_items = resolve_new_items(&listing.items, &logged);
        report.fetched = listing.items.len();
        report.new_items = new_items.len();
        report.event_title = listing.event_title.clone();
        log::info!(
            "{key}: {} listed, {} already logged, {} new",
            report.fetched,
            logged.len(),
            report.new_items
        );

        if new_items.is_empty() {
            return Ok(report);
        }

        let hashtags = self
            .hashtags(category, listing.event_title.as_deref())
            .await;
        let workspace = self.config.render.workspace_dir.join(key);

        for item in new_items {
            let outcome = self.announce(category, item, &hashtags, &workspace).await?;
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    /// Render, compose, publish and log a single item.
    async fn announce(
        &self,
        category: &CategoryConfig,
        item: Item,
        hashtags: &str,
        workspace: &Path,
    ) -> Result<ItemOutcome> {
        let key = category.category.key();
        log::info!("{key}: new document {} ({})", item.title, item.published_label());

        let (images, render_error) = match self.render(&item, workspace).await {
            Ok(images) => (images, None),
            Err(e) => {
                log::warn!("{key}: preview failed, publishing text only: {e}");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let text = compose(&item, category, hashtags);

        let status = match self.deps.publisher.publish(&text, &images).await {
            Ok(receipt) if receipt.dry_run => {
                log::info!("{key}: dry run, not logging {}", item.title);
                ItemStatus::DryRun
            }
            Ok(receipt) => {
                if let Err(e) = self.deps.log.append(category.category, &item).await {
                    let err = as_log_error(key, e);
                    self.deps
                        .notifier
                        .notify_failure(
                            &format!("Failed to write log - {key}"),
                            &format!("{err}\n\nPublished but not logged:\n{text}"),
                        )
                        .await;
                    return Err(err);
                }
                log::info!("{key}: published and logged {}", item.title);
                ItemStatus::Logged {
                    post_id: receipt.id,
                }
            }
            Err(e) => {
                let err = as_publish_error(key, e);
                self.deps
                    .notifier
                    .notify_failure(
                        &format!("Failed to publish - {key}"),
                        &format!("{err}\n\n{text}"),
                    )
                    .await;
                ItemStatus::PublishFailed(err.to_string())
            }
        };

        Ok(ItemOutcome {
            item,
            images: images.len(),
            render_error,
            status,
        })
    }

    /// Fresh workspace, then preview images.
    async fn render(&self, item: &Item, workspace: &Path) -> Result<Vec<PathBuf>> {
        reset_dir(workspace)
            .await
            .map_err(|e| AppError::render(&item.href, e))?;
        self.deps
            .renderer
            .render_preview(&item.href, workspace, self.config.render.max_pages)
            .await
    }

    /// Race, category and common hashtags for this run.
    async fn hashtags(&self, category: &CategoryConfig, event_title: Option<&str>) -> String {
        let race = match event_title {
            Some(title) => match self.deps.hashtags.hashtags_for(title) {
                Some(tags) => tags,
                None => {
                    self.deps
                        .notifier
                        .notify_failure(
                            &format!("Failed to get race hashtags - {}", category.category),
                            &format!("No hashtags mapped for event '{title}'"),
                        )
                        .await;
                    String::new()
                }
            },
            None => String::new(),
        };

        build_hashtags(&race, category, &self.config.common_hashtags)
    }
}

fn as_fetch_error(category: &str, e: AppError) -> AppError {
    match e {
        AppError::Fetch { .. } => e,
        other => AppError::fetch(category, other),
    }
}

fn as_publish_error(category: &str, e: AppError) -> AppError {
    match e {
        AppError::Publish { .. } => e,
        other => AppError::publish(category, other),
    }
}

fn as_log_error(category: &str, e: AppError) -> AppError {
    match e {
        AppError::Log { .. } => e,
        other => AppError::log(category, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Listing;
    use crate::services::{DryRunPublisher, HashtagMap, PublishReceipt};
    use crate::storage::LocalLog;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn doc(hour: u32, title: &str) -> Item {
        Item::new(
            Category::F1,
            Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            title,
            format!("https://www.fia.com/{title}.pdf"),
        )
    }

    struct FakeFetcher {
        listing: Option<Listing>,
    }

    #[async_trait]
    impl ListingFetcher for FakeFetcher {
        async fn fetch(&self, category: &CategoryConfig) -> Result<Listing> {
            self.listing
                .clone()
                .ok_or_else(|| AppError::fetch(category.category.key(), "unreachable"))
        }
    }

    struct FakeRenderer {
        fail: bool,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render_preview(
            &self,
            url: &str,
            workspace: &Path,
            max_pages: usize,
        ) -> Result<Vec<PathBuf>> {
            if self.fail {
                return Err(AppError::render(url, "not a pdf"));
            }
            // Workspace must be empty on entry.
            assert_eq!(std::fs::read_dir(workspace).unwrap().count(), 0);
            let mut pages = Vec::new();
            for i in 1..=max_pages.min(2) {
                let page = workspace.join(format!("page-{i}.jpg"));
                std::fs::write(&page, b"jpg").unwrap();
                pages.push(page);
            }
            Ok(pages)
        }
    }

    #[derive(Default)]
    struct FakePublisher {
        fail_titles: Vec<String>,
        posts: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(&self, text: &str, images: &[PathBuf]) -> Result<PublishReceipt> {
            if self.fail_titles.iter().any(|t| text.contains(t.as_str())) {
                return Err(AppError::publish("F1", "rate limited"));
            }
            let mut posts = self.posts.lock().unwrap();
            posts.push((text.to_string(), images.len()));
            Ok(PublishReceipt {
                id: posts.len().to_string(),
                url: None,
                dry_run: false,
            })
        }
    }

    /// Local log whose reads or appends can be made to fail.
    struct FlakyLog {
        inner: LocalLog,
        fail_load: bool,
        fail_append: bool,
    }

    #[async_trait]
    impl ItemLog for FlakyLog {
        async fn load_all(&self, category: Category) -> Result<Vec<Item>> {
            if self.fail_load {
                return Err(AppError::log(category.key(), "permission denied"));
            }
            self.inner.load_all(category).await
        }

        async fn save_all(&self, category: Category, items: &[Item]) -> Result<()> {
            self.inner.save_all(category, items).await
        }

        async fn append(&self, category: Category, item: &Item) -> Result<()> {
            if self.fail_append {
                return Err(AppError::log(category.key(), "disk full"));
            }
            self.inner.append(category, item).await
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        subjects: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn notify_failure(&self, subject: &str, _body: &str) {
            self.subjects.lock().unwrap().push(subject.to_string());
        }
    }

    struct Harness {
        _tmp: TempDir,
        config: Config,
        log: LocalLog,
        hashtags: HashtagMap,
        notifier: FakeNotifier,
    }

    impl Harness {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let mut config = Config::default();
            config.render.workspace_dir = tmp.path().join("tmp");
            let log = LocalLog::new(tmp.path().join("logs"));
            let hashtags = HashtagMap::new(HashMap::from([(
                "Monaco Grand Prix".to_string(),
                "#MonacoGP".to_string(),
            )]));
            Self {
                _tmp: tmp,
                config,
                log,
                hashtags,
                notifier: FakeNotifier::default(),
            }
        }

        async fn run(
            &self,
            fetcher: &FakeFetcher,
            renderer: &FakeRenderer,
            publisher: &dyn Publisher,
        ) -> Result<RunReport> {
            self.run_with_log(&self.log, fetcher, renderer, publisher)
                .await
        }

        async fn run_with_log(
            &self,
            log: &dyn ItemLog,
            fetcher: &FakeFetcher,
            renderer: &FakeRenderer,
            publisher: &dyn Publisher,
        ) -> Result<RunReport> {
            let deps = Collaborators {
                log,
                fetcher,
                renderer,
                publisher,
                notifier: &self.notifier,
                hashtags: &self.hashtags,
            };
            let category = Category::F1.default_config();
            PublishPipeline::new(&self.config, deps).run(&category).await
        }

        async fn logged(&self) -> Vec<Item> {
            self.log.load_all(Category::F1).await.unwrap()
        }
    }

    fn listing(items: Vec<Item>) -> FakeFetcher {
        FakeFetcher {
            listing: Some(Listing {
                event_title: Some("Monaco Grand Prix".to_string()),
                items,
            }),
        }
    }

    #[tokio::test]
    async fn test_single_new_item_is_published_and_logged() {
        let h = Harness::new();
        let fetcher = listing(vec![doc(10, "Doc A")]);
        let publisher = FakePublisher::default();

        let report = h
            .run(&fetcher, &FakeRenderer { fail: false }, &publisher)
            .await
            .unwrap();

        assert_eq!(report.new_items, 1);
        assert_eq!(report.published(), 1);
        assert_eq!(h.logged().await, vec![doc(10, "Doc A")]);

        let posts = publisher.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1, 2);
        assert!(posts[0].0.contains("Published at: 2024/05/01 10:00 UTC"));
        assert!(posts[0].0.ends_with("#MonacoGP #Formula1 #F1 #FIA #GrandPrix"));
    }

    #[tokio::test]
    async fn test_second_run_publishes_nothing() {
        let h = Harness::new();
        let fetcher = listing(vec![doc(11, "Doc B"), doc(10, "Doc A")]);
        let publisher = FakePublisher::default();
        let renderer = FakeRenderer { fail: false };

        let first = h.run(&fetcher, &renderer, &publisher).await.unwrap();
        let second = h.run(&fetcher, &renderer, &publisher).await.unwrap();

        assert_eq!(first.published(), 2);
        assert_eq!(second.new_items, 0);
        assert!(second.outcomes.is_empty());
        assert_eq!(publisher.posts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_items_published_oldest_first() {
        let h = Harness::new();
        let fetcher = listing(vec![doc(12, "Doc C"), doc(10, "Doc A"), doc(11, "Doc B")]);
        let publisher = FakePublisher::default();

        h.run(&fetcher, &FakeRenderer { fail: false }, &publisher)
            .await
            .unwrap();

        let logged: Vec<_> = h.logged().await.into_iter().map(|i| i.title).collect();
        assert_eq!(logged, vec!["Doc A", "Doc B", "Doc C"]);

        let posts = publisher.posts.lock().unwrap();
        assert!(posts[0].0.contains("Doc A"));
        assert!(posts[2].0.contains("Doc C"));
    }

    #[tokio::test]
    async fn test_render_failure_publishes_text_only() {
        let h = Harness::new();
        let fetcher = listing(vec![doc(10, "Doc A")]);
        let publisher = FakePublisher::default();

        let report = h
            .run(&fetcher, &FakeRenderer { fail: true }, &publisher)
            .await
            .unwrap();

        assert_eq!(report.published(), 1);
        assert_eq!(report.text_only(), 1);
        assert!(report.outcomes[0].render_error.is_some());
        assert_eq!(publisher.posts.lock().unwrap()[0].1, 0);
        assert_eq!(h.logged().await.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_item_unlogged_and_continues() {
        let h = Harness::new();
        let fetcher = listing(vec![doc(11, "Doc B"), doc(10, "Doc A")]);
        let publisher = FakePublisher {
            fail_titles: vec!["Doc A".to_string()],
            ..FakePublisher::default()
        };
        let renderer = FakeRenderer { fail: false };

        let report = h.run(&fetcher, &renderer, &publisher).await.unwrap();

        assert_eq!(report.published(), 1);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes[0].status,
            ItemStatus::PublishFailed(_)
        ));
        assert_eq!(h.logged().await, vec![doc(11, "Doc B")]);
        assert!(
            h.notifier
                .subjects
                .lock()
                .unwrap()
                .contains(&"Failed to publish - F1".to_string())
        );

        // Next run retries the failed item only.
        let retry = h
            .run(&fetcher, &renderer, &FakePublisher::default())
            .await
            .unwrap();
        assert_eq!(retry.new_items, 1);
        assert_eq!(retry.outcomes[0].item, doc(10, "Doc A"));
        assert_eq!(retry.published(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_without_log_writes() {
        let h = Harness::new();
        let fetcher = FakeFetcher { listing: None };

        let err = h
            .run(&fetcher, &FakeRenderer { fail: false }, &FakePublisher::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Fetch { .. }));
        assert!(err.is_category_fatal());
        assert!(h.logged().await.is_empty());
        assert_eq!(
            h.notifier.subjects.lock().unwrap().as_slice(),
            ["Failed to fetch documents - F1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_an_error() {
        let h = Harness::new();
        let fetcher = FakeFetcher {
            listing: Some(Listing::default()),
        };

        let report = h
            .run(&fetcher, &FakeRenderer { fail: false }, &FakePublisher::default())
            .await
            .unwrap();

        assert_eq!(report.fetched, 0);
        assert_eq!(report.new_items, 0);
    }

    #[tokio::test]
    async fn test_unknown_event_notifies_and_still_publishes() {
        let h = Harness::new();
        let fetcher = FakeFetcher {
            listing: Some(Listing {
                event_title: Some("Miami Grand Prix".to_string()),
                items: vec![doc(10, "Doc A")],
            }),
        };
        let publisher = FakePublisher::default();

        let report = h
            .run(&fetcher, &FakeRenderer { fail: false }, &publisher)
            .await
            .unwrap();

        assert_eq!(report.published(), 1);
        assert!(publisher.posts.lock().unwrap()[0].0.ends_with("#Formula1 #F1 #FIA #GrandPrix"));
        assert_eq!(
            h.notifier.subjects.lock().unwrap().as_slice(),
            ["Failed to get race hashtags - F1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_workspace_is_reset_between_items() {
        let h = Harness::new();
        let workspace = h.config.render.workspace_dir.join("F1");
        std::fs::create_dir_all(&workspace).unwrap();
        std::fs::write(workspace.join("stale.jpg"), b"old").unwrap();

        // FakeRenderer asserts the workspace is empty on every call.
        let report = h
            .run(
                &listing(vec![doc(11, "Doc B"), doc(10, "Doc A")]),
                &FakeRenderer { fail: false },
                &FakePublisher::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.published(), 2);
        assert!(!workspace.join("stale.jpg").exists());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_log_untouched() {
        let h = Harness::new();
        let fetcher = listing(vec![doc(11, "Doc B"), doc(10, "Doc A")]);
        let renderer = FakeRenderer { fail: false };

        let report = h.run(&fetcher, &renderer, &DryRunPublisher).await.unwrap();

        assert_eq!(report.dry_run(), 2);
        assert_eq!(report.published(), 0);
        assert_eq!(report.failed(), 0);
        assert!(h.logged().await.is_empty());

        // A real run afterwards still announces both.
        let publisher = FakePublisher::default();
        let real = h.run(&fetcher, &renderer, &publisher).await.unwrap();
        assert_eq!(real.published(), 2);
        assert_eq!(publisher.posts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_log_read_failure_notifies_and_aborts() {
        let h = Harness::new();
        let log = FlakyLog {
            inner: LocalLog::new(h.config.render.workspace_dir.join("logs")),
            fail_load: true,
            fail_append: false,
        };
        let publisher = FakePublisher::default();

        let err = h
            .run_with_log(
                &log,
                &listing(vec![doc(10, "Doc A")]),
                &FakeRenderer { fail: false },
                &publisher,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Log { .. }));
        assert!(err.is_category_fatal());
        assert!(publisher.posts.lock().unwrap().is_empty());
        assert_eq!(
            h.notifier.subjects.lock().unwrap().as_slice(),
            ["Failed to read log - F1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_log_append_failure_stops_remaining_items() {
        let h = Harness::new();
        let log = FlakyLog {
            inner: LocalLog::new(h.config.render.workspace_dir.join("logs")),
            fail_load: false,
            fail_append: true,
        };
        let publisher = FakePublisher::default();

        let err = h
            .run_with_log(
                &log,
                &listing(vec![doc(12, "Doc C"), doc(11, "Doc B"), doc(10, "Doc A")]),
                &FakeRenderer { fail: false },
                &publisher,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Log { .. }));
        assert!(err.is_category_fatal());

        // Only the oldest item went out before the abort.
        let posts = publisher.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].0.contains("Doc A"));
        assert_eq!(
            h.notifier.subjects.lock().unwrap().as_slice(),
            ["Failed to write log - F1".to_string()]
        );
    }
}

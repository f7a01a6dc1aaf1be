//! FIA documents bot CLI
//!
//! Local execution entry point, meant to be started periodically by cron
//! or a systemd timer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fia_docs::{
    error::{AppError, Result},
    models::{Category, CategoryConfig, Config, NotifierKind, PublisherKind},
    pipeline::{Collaborators, PublishPipeline, RunReport},
    services::{
        DryRunPublisher, FiaListingFetcher, FileRunLock, HashtagMap, LogNotifier,
        MastodonPublisher, Notifier, PdftoppmRenderer, Publisher, RunGuard,
    },
    storage::{ItemLog, LocalLog},
    utils::http,
};

/// fia-docs - FIA decision document announcer
#[derive(Parser, Debug)]
#[command(
    name = "fia-docs",
    version,
    about = "Announces new FIA F1/F2/F3 documents"
)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "fia-docs.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log posts instead of publishing them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Announce new documents (default)
    Run {
        /// Only run this category
        #[arg(long)]
        category: Option<Category>,
    },

    /// Validate the config file
    Validate,

    /// Show per-category log info
    Info,

    /// Import a log written newest-first by the old scripts
    ImportLegacy {
        category: Category,
        file: PathBuf,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn build_publisher(config: &Config, dry_run: bool) -> Result<Box<dyn Publisher>> {
    if dry_run {
        return Ok(Box::new(DryRunPublisher));
    }
    Ok(match config.publisher.kind {
        PublisherKind::DryRun => Box::new(DryRunPublisher),
        PublisherKind::Mastodon => Box::new(MastodonPublisher::from_config(&config.publisher)?),
    })
}

fn build_notifier(config: &Config) -> Result<Box<dyn Notifier>> {
    Ok(match config.notifier.kind {
        NotifierKind::Log => Box::new(LogNotifier),
        #[cfg(feature = "email")]
        NotifierKind::Email => Box::new(fia_docs::services::EmailNotifier::from_config(
            &config.notifier,
        )?),
        #[cfg(not(feature = "email"))]
        NotifierKind::Email => {
            log::warn!("Built without the `email` feature; failures go to the log only");
            Box::new(LogNotifier)
        }
    })
}

fn select_categories(config: &Config, only: Option<Category>) -> Result<Vec<&CategoryConfig>> {
    match only {
        Some(category) => config
            .category(category)
            .map(|c| vec![c])
            .ok_or_else(|| AppError::config(format!("category {category} is not configured"))),
        None => Ok(config.enabled_categories().collect()),
    }
}

fn log_report(report: &RunReport) {
    log::info!(
        "{}: {} listed, {} new, {} published ({} text-only), {} dry-run, {} failed",
        report.category,
        report.fetched,
        report.new_items,
        report.published(),
        report.text_only(),
        report.dry_run(),
        report.failed()
    );
}

/// Run the selected categories under the run lock.
///
/// Returns whether any category ended with a fatal error.
async fn run(config: &Config, only: Option<Category>, dry_run: bool) -> Result<bool> {
    let lock = FileRunLock::new(&config.paths.lock_file);
    let Some(_guard) = RunGuard::acquire(&lock, std::process::id())? else {
        log::info!(
            "Already running ({} exists), nothing to do",
            lock.path().display()
        );
        return Ok(false);
    };

    let categories = select_categories(config, only)?;

    let client = http::create_async_client(&config.fetcher)?;
    let fetcher = FiaListingFetcher::with_client(&config.fetcher, client.clone())?;
    let renderer = PdftoppmRenderer::new(&config.render, client);
    let publisher = build_publisher(config, dry_run)?;
    let notifier = build_notifier(config)?;
    let hashtags = HashtagMap::load_or_empty(&config.paths.hashtags_file);
    let log_store = LocalLog::new(&config.paths.log_dir);

    let pipeline = PublishPipeline::new(
        config,
        Collaborators {
            log: &log_store,
            fetcher: &fetcher,
            renderer: &renderer,
            publisher: publisher.as_ref(),
            notifier: notifier.as_ref(),
            hashtags: &hashtags,
        },
    );

    let mut fatal = false;
    for (category, result) in pipeline.run_categories(&categories).await {
        match result {
            Ok(report) => log_report(&report),
            Err(e) => {
                fatal |= e.is_category_fatal();
                log::error!("{category}: run aborted: {e}");
            }
        }
    }

    Ok(fatal)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_if_exists(&cli.config)?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command.unwrap_or(Command::Run { category: None }) {
        Command::Run { category } => {
            config.validate()?;
            if run(&config, category, cli.dry_run).await? {
                std::process::exit(1);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "Config OK ({} categories enabled)",
                config.enabled_categories().count()
            );
        }

        Command::Info => {
            let log_store = LocalLog::new(&config.paths.log_dir);
            log::info!("Log directory: {}", config.paths.log_dir.display());

            for category in &config.categories {
                let items = log_store.load_all(category.category).await?;
                match items.last() {
                    Some(newest) => log::info!(
                        "{}: {} logged, newest {} \"{}\"",
                        category.category,
                        items.len(),
                        newest.published_label(),
                        newest.title
                    ),
                    None => log::info!("{}: no documents logged yet", category.category),
                }
            }
        }

        Command::ImportLegacy { category, file } => {
            let log_store = LocalLog::new(&config.paths.log_dir);
            let imported = log_store.import_legacy(category, &file).await?;
            log::info!(
                "Imported {} {} documents into {}",
                imported,
                category,
                log_store.path(category).display()
            );
        }
    }

    Ok(())
}

//! Local filesystem log implementation.
//!
//! Each category is one pretty-printed JSON array in `{root}/log_<KEY>.json`,
//! oldest item first. Writes go to a temp file which is synced and then
//! renamed over the previous log, so a crash leaves either the old or the
//! new log on disk, never a torn one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Category, Item};
use crate::storage::{ItemLog, LogRecord};

/// Local filesystem log backend.
pub struct LocalLog {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalLog {
    /// Create a new LocalLog rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the log file path for a category.
    pub fn path(&self, category: Category) -> PathBuf {
        self.root_dir.join(category.log_file_name())
    }

    /// Write bytes atomically (write to temp, sync, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        sync_dir(&self.root_dir).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn read_records(path: &Path, category: Category) -> Result<Option<Vec<LogRecord>>> {
        let bytes = Self::read_bytes(path)
            .await
            .map_err(|e| AppError::log(category.key(), format!("{}: {e}", path.display())))?;

        bytes
            .map(|b| serde_json::from_slice(&b))
            .transpose()
            .map_err(|e| AppError::log(category.key(), format!("{}: {e}", path.display())))
    }

    /// Import a log written newest-first by the previous scripts.
    ///
    /// Refuses to overwrite a non-empty log. Returns the number of items
    /// imported.
    pub async fn import_legacy(&self, category: Category, legacy: &Path) -> Result<usize> {
        if !self.load_all(category).await?.is_empty() {
            return Err(AppError::validation(format!(
                "log for {category} already has entries; refusing to import"
            )));
        }

        let records = Self::read_records(legacy, category).await?.ok_or_else(|| {
            AppError::validation(format!("legacy log {} not found", legacy.display()))
        })?;

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(records.len());
        for record in records.into_iter().rev() {
            let item = record.into_item(category)?;
            if seen.insert(item.clone()) {
                items.push(item);
            }
        }

        self.save_all(category, &items).await?;
        log::info!(
            "Imported {} item(s) into {}",
            items.len(),
            self.path(category).display()
        );
        Ok(items.len())
    }
}

#[async_trait]
impl ItemLog for LocalLog {
    async fn load_all(&self, category: Category) -> Result<Vec<Item>> {
        let path = self.path(category);
        match Self::read_records(&path, category).await? {
            Some(records) => records
                .into_iter()
                .map(|r| r.into_item(category))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| AppError::log(category.key(), e)),
            None => {
                log::debug!("No log at {} yet", path.display());
                Ok(Vec::new())
            }
        }
    }

    async fn save_all(&self, category: Category, items: &[Item]) -> Result<()> {
        let records: Vec<LogRecord> = items.iter().map(LogRecord::from).collect();
        let bytes = serde_json::to_vec_pretty(&records)?;
        let path = self.path(category);
        self.write_bytes(&path, &bytes)
            .await
            .map_err(|e| AppError::log(category.key(), format!("{}: {e}", path.display())))
    }

    async fn append(&self, category: Category, item: &Item) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut items = self.load_all(category).await?;
        if items.contains(item) {
            log::debug!("{} already logged for {}", item.title, category);
            return Ok(());
        }
        items.push(item.clone());
        self.save_all(category, &items).await
    }
}

/// Sync a directory so a rename inside it survives power loss.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

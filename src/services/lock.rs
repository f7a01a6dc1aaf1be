//! Single-run guard backed by a marker file.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::services::RunLock;

/// Lock held by the existence of a file containing the owner's pid.
///
/// A crashed run leaves the file behind; it must be removed by hand before
/// the next run can start.
#[derive(Debug, Clone)]
pub struct FileRunLock {
    path: PathBuf,
}

impl FileRunLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create the marker file and fill it with `write`.
    ///
    /// A marker that could not be filled is removed again so it does not
    /// block later runs.
    fn create_marker(&self, write: impl FnOnce(&mut File) -> std::io::Result<()>) -> Result<bool> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(AppError::Lock(format!("{}: {e}", self.path.display()))),
        };

        if let Err(e) = write(&mut file) {
            drop(file);
            if let Err(cleanup) = std::fs::remove_file(&self.path) {
                log::warn!("Failed to remove {}: {cleanup}", self.path.display());
            }
            return Err(AppError::Lock(format!("{}: {e}", self.path.display())));
        }
        Ok(true)
    }
}

impl RunLock for FileRunLock {
    fn try_acquire(&self, pid: u32) -> Result<bool> {
        self.create_marker(|file| {
            writeln!(file, "{pid}")?;
            file.sync_all()
        })
    }

    fn release(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Lock(format!("{}: {e}", self.path.display()))),
        }
    }
}

/// Releases the run lock when dropped.
pub struct RunGuard<'a> {
    lock: &'a dyn RunLock,
}

impl<'a> RunGuard<'a> {
    /// Acquire `lock` for `pid`. `Ok(None)` means another run holds it.
    pub fn acquire(lock: &'a dyn RunLock, pid: u32) -> Result<Option<Self>> {
        Ok(lock.try_acquire(pid)?.then_some(Self { lock }))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            log::warn!("Failed to release run lock: {e}");
        }
    }
}

//! Filesystem helpers for the render workspace.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Remove `dir` with everything in it and recreate it empty.
pub async fn reset_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Files in `dir` with the given extension, sorted by file name.
pub async fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reset_dir_clears_stale_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("work");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("page-1.jpg"), b"stale").unwrap();

        reset_dir(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_reset_dir_creates_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b");

        reset_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_files_with_extension_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["page-2.jpg", "doc.pdf", "page-1.jpg", "page-3.JPG"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let files = files_with_extension(tmp.path(), "jpg").await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["page-1.jpg", "page-2.jpg", "page-3.JPG"]);
    }
}

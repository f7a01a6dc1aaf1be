//! PDF preview rendering through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::RenderConfig;
use crate::services::Renderer;
use crate::utils::fs::files_with_extension;
use crate::utils::http::fetch_bytes;

const PDF_FILE: &str = "document.pdf";
const PAGE_PREFIX: &str = "page";

/// Downloads the PDF into the workspace and rasterizes its first pages.
pub struct PdftoppmRenderer {
    client: Client,
    binary: String,
    dpi: u32,
}

impl PdftoppmRenderer {
    pub fn new(config: &RenderConfig, client: Client) -> Self {
        Self {
            client,
            binary: config.pdftoppm.clone(),
            dpi: config.dpi,
        }
    }

    async fn render(&self, url: &str, workspace: &Path, max_pages: usize) -> Result<Vec<PathBuf>> {
        let pdf = workspace.join(PDF_FILE);
        let bytes = fetch_bytes(&self.client, url).await?;
        tokio::fs::write(&pdf, &bytes).await?;
        log::debug!("Downloaded {} bytes from {}", bytes.len(), url);

        let output = Command::new(&self.binary)
            .arg("-jpeg")
            .args(["-r", &self.dpi.to_string()])
            .args(["-f", "1", "-l", &max_pages.to_string()])
            .arg(&pdf)
            .arg(workspace.join(PAGE_PREFIX))
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::render(
                url,
                format!("{} exited with {}: {}", self.binary, output.status, stderr.trim()),
            ));
        }

        let mut images = files_with_extension(workspace, "jpg").await?;
        images.truncate(max_pages);
        if images.is_empty() {
            return Err(AppError::render(url, "no pages rendered"));
        }
        Ok(images)
    }
}

#[async_trait]
impl Renderer for PdftoppmRenderer {
    async fn render_preview(
        &self,
        url: &str,
        workspace: &Path,
        max_pages: usize,
    ) -> Result<Vec<PathBuf>> {
        self.render(url, workspace, max_pages)
            .await
            .map_err(|e| match e {
                AppError::Render { .. } => e,
                other => AppError::render(url, other),
            })
    }
}

//! Social post transports.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::PublisherConfig;
use crate::services::{PublishReceipt, Publisher};

/// Attachments accepted per status by Mastodon.
const MAX_ATTACHMENTS: usize = 4;

/// Publishes statuses to a Mastodon instance.
pub struct MastodonPublisher {
    client: Client,
    instance: Url,
    token: String,
}

#[derive(Deserialize)]
struct MediaAttachment {
    id: String,
}

#[derive(Serialize)]
struct NewStatus<'a> {
    status: &'a str,
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct Status {
    id: String,
    url: Option<String>,
}

impl MastodonPublisher {
    /// Build a publisher, reading the access token from the configured
    /// environment variable.
    pub fn from_config(config: &PublisherConfig) -> Result<Self> {
        let token = std::env::var(&config.access_token_env).map_err(|_| {
            AppError::config(format!("{} is not set", config.access_token_env))
        })?;
        let instance = Url::parse(&config.instance_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self::new(client, instance, token))
    }

    pub fn new(client: Client, instance: Url, token: String) -> Self {
        Self {
            client,
            instance,
            token,
        }
    }

    async fn upload_media(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("preview.jpg")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")?;

        let media: MediaAttachment = self
            .client
            .post(self.instance.join("api/v2/media")?)
            .bearer_auth(&self.token)
            .multipart(Form::new().part("file", part))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(media.id)
    }
}

#[async_trait]
impl Publisher for MastodonPublisher {
    async fn publish(&self, text: &str, images: &[PathBuf]) -> Result<PublishReceipt> {
        let mut media_ids = Vec::new();
        for image in images.iter().take(MAX_ATTACHMENTS) {
            media_ids.push(self.upload_media(image).await?);
        }

        let status: Status = self
            .client
            .post(self.instance.join("api/v1/statuses")?)
            .bearer_auth(&self.token)
            .json(&NewStatus {
                status: text,
                media_ids,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        log::info!("Published status {}", status.id);
        Ok(PublishReceipt {
            id: status.id,
            url: status.url,
            dry_run: false,
        })
    }
}

/// Logs the post instead of sending it.
#[derive(Debug, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, text: &str, images: &[PathBuf]) -> Result<PublishReceipt> {
        log::info!("[dry-run] would publish with {} image(s):\n{}", images.len(), text);
        Ok(PublishReceipt {
            id: "dry-run".to_string(),
            url: None,
            dry_run: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_always_succeeds() {
        let receipt = DryRunPublisher
            .publish("hello", &[PathBuf::from("page-1.jpg")])
            .await
            .unwrap();
        assert_eq!(receipt.id, "dry-run");
        assert!(receipt.url.is_none());
        assert!(receipt.dry_run);
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let config = PublisherConfig {
            instance_url: "https://example.social".to_string(),
            access_token_env: "FIA_DOCS_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..PublisherConfig::default()
        };

        let err = MastodonPublisher::from_config(&config).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_status_payload_shape() {
        let payload = NewStatus {
            status: "text",
            media_ids: vec!["1".into(), "2".into()],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "text");
        assert_eq!(json["media_ids"][1], "2");
    }
}

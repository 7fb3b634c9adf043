//! Preview download
//!
//! The clip is read into memory chunk by chunk under a byte cap and a
//! per-request timeout. Nothing touches disk, so a cancelled download
//! leaves nothing behind.

use crate::config::DownloadConfig;
use crate::error::FetchError;
use crate::types::{PreviewFetch, PreviewPayload, PreviewReference};
use tracing::debug;

/// HTTP downloader for preview clips
pub struct PreviewFetcher {
    http_client: reqwest::Client,
    config: DownloadConfig,
}

impl PreviewFetcher {
    pub fn new(http_client: reqwest::Client, config: DownloadConfig) -> Self {
        Self { http_client, config }
    }
}

#[async_trait::async_trait]
impl PreviewFetch for PreviewFetcher {
    async fn fetch(&self, preview: &PreviewReference) -> Result<PreviewPayload, FetchError> {
        let limit = self.config.max_bytes;

        let mut response = self
            .http_client
            .get(&preview.url)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut bytes = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(url = %preview.url, bytes = bytes.len(), "Preview downloaded");

        Ok(PreviewPayload {
            bytes,
            extension: preview.extension().map(str::to_lowercase),
        })
    }
}

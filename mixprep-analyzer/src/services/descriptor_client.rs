//! Remote descriptor service client
//!
//! Fast path of the resolver: a single GET by catalog track id against a
//! third-party descriptor API (RapidAPI-style key/host headers). Any
//! failure (missing key, transport, non-200, malformed body, missing
//! tempo) is a miss, and the resolver falls back to audio analysis.

use crate::analysis::normalize_bpm;
use crate::config::LookupConfig;
use crate::error::LookupError;
use crate::types::{DescriptorLookup, Descriptors};
use mixprep_common::{CamelotKey, UNKNOWN_KEY};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

/// Descriptor API response (only the fields used here)
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorResponse {
    pub tempo: Option<f64>,
    /// Key already in Camelot notation, e.g. "10A"
    pub camelot: Option<String>,
    pub energy: Option<f64>,
}

impl DescriptorResponse {
    /// Convert to descriptors; `None` when the response carries no tempo
    ///
    /// The key is only taken when it already parses as a Camelot label. Raw
    /// pitch/mode fields are never used to derive one.
    pub fn into_descriptors(self, default_energy: f64) -> Option<Descriptors> {
        let tempo = self.tempo?;

        let key = self
            .camelot
            .as_deref()
            .and_then(|label| label.parse::<CamelotKey>().ok())
            .map(|key| key.to_string())
            .unwrap_or_else(|| UNKNOWN_KEY.to_string());

        Some(Descriptors {
            bpm: normalize_bpm(tempo),
            key,
            energy: self.energy.unwrap_or(default_energy),
        })
    }
}

/// HTTP client for the remote descriptor API
pub struct DescriptorClient {
    http_client: reqwest::Client,
    config: LookupConfig,
}

impl DescriptorClient {
    pub fn new(http_client: reqwest::Client, config: LookupConfig) -> Self {
        Self { http_client, config }
    }

    fn track_url(&self, track_id: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| LookupError::Transport(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Transport("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["pktx", "spotify", track_id]);
        Ok(url)
    }

    /// Query the service; `Ok(None)` when it answers without a tempo
    pub async fn fetch(&self, track_id: &str, api_key: &str) -> Result<Option<Descriptors>, LookupError> {
        let url = self.track_url(track_id)?;

        debug!(track_id = %track_id, url = %url, "Querying descriptor API");

        let response = self
            .http_client
            .get(url)
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", &self.config.api_host)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body: DescriptorResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        Ok(body.into_descriptors(self.config.default_energy))
    }
}

#[async_trait::async_trait]
impl DescriptorLookup for DescriptorClient {
    async fn lookup(&self, track_id: &str) -> Option<Descriptors> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!(track_id = %track_id, "No descriptor API key configured, skipping lookup");
            return None;
        };

        match self.fetch(track_id, api_key).await {
            Ok(Some(descriptors)) => {
                debug!(
                    track_id = %track_id,
                    bpm = descriptors.bpm,
                    key = %descriptors.key,
                    "Descriptor lookup hit"
                );
                Some(descriptors)
            }
            Ok(None) => {
                debug!(track_id = %track_id, "Descriptor response has no tempo");
                None
            }
            Err(e) => {
                debug!(track_id = %track_id, error = %e, "Descriptor lookup failed");
                None
            }
        }
    }
}

//! Per-track resolution
//!
//! **Sequence** (strictly in order, first success wins):
//! 1. Remote descriptor lookup, when the track has a catalog id
//! 2. Preview search
//! 3. Preview download
//! 4. Local signal analysis on the blocking pool
//!
//! Every branch ends in a complete `AnalysisResult`; failures are encoded
//! in its status and never returned as errors.

use crate::analysis::SignalAnalyzer;
use crate::config::AnalyzerConfig;
use crate::services::descriptor_client::DescriptorClient;
use crate::services::preview_fetcher::PreviewFetcher;
use crate::services::preview_locator::PreviewLocator;
use crate::types::{AudioAnalyze, DescriptorLookup, PreviewFetch, PreviewLocate, TrackResolve};
use mixprep_common::{AnalysisResult, ResolutionStatus, ResultSource, TrackMetadata};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cascading resolver over the four strategy seams
#[derive(Clone)]
pub struct TrackResolver {
    lookup: Arc<dyn DescriptorLookup>,
    locator: Arc<dyn PreviewLocate>,
    fetcher: Arc<dyn PreviewFetch>,
    analyzer: Arc<dyn AudioAnalyze>,
}

impl TrackResolver {
    pub fn new(
        lookup: Arc<dyn DescriptorLookup>,
        locator: Arc<dyn PreviewLocate>,
        fetcher: Arc<dyn PreviewFetch>,
        analyzer: Arc<dyn AudioAnalyze>,
    ) -> Self {
        Self {
            lookup,
            locator,
            fetcher,
            analyzer,
        }
    }

    /// Wire the network-backed strategies onto one shared HTTP client
    pub fn from_config(http_client: reqwest::Client, config: &AnalyzerConfig) -> Self {
        Self::new(
            Arc::new(DescriptorClient::new(http_client.clone(), config.lookup.clone())),
            Arc::new(PreviewLocator::new(http_client.clone(), config.search.clone())),
            Arc::new(PreviewFetcher::new(http_client, config.download.clone())),
            Arc::new(SignalAnalyzer::new(config.analysis.clone())),
        )
    }
}

#[async_trait::async_trait]
impl TrackResolve for TrackResolver {
    async fn resolve(&self, track: TrackMetadata) -> AnalysisResult {
        if let Some(track_id) = track.catalog_id() {
            if let Some(descriptors) = self.lookup.lookup(track_id).await {
                info!(track = %track.title, artist = %track.artist, "Resolved from descriptor service");
                return AnalysisResult::resolved(
                    track,
                    descriptors.bpm,
                    descriptors.key,
                    descriptors.energy,
                    ResolutionStatus::ResolvedRemote,
                    ResultSource::RemoteLookup,
                );
            }
        }

        let Some(preview) = self
            .locator
            .locate(&track.artist, &track.title, track.duration_ms)
            .await
        else {
            info!(track = %track.title, artist = %track.artist, "No preview found");
            return AnalysisResult::unresolved(track, ResolutionStatus::NoPreview);
        };

        let payload = match self.fetcher.fetch(&preview).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(track = %track.title, url = %preview.url, error = %e, "Preview download failed");
                return AnalysisResult::unresolved(track, ResolutionStatus::DownloadFailed);
            }
        };

        debug!(track = %track.title, bytes = payload.bytes.len(), "Dispatching preview analysis");

        let analyzer = Arc::clone(&self.analyzer);
        match tokio::task::spawn_blocking(move || analyzer.analyze(payload)).await {
            Ok(Ok(descriptors)) => {
                info!(
                    track = %track.title,
                    bpm = descriptors.bpm,
                    key = %descriptors.key,
                    energy = descriptors.energy,
                    "Resolved from audio analysis"
                );
                AnalysisResult::resolved(
                    track,
                    descriptors.bpm,
                    descriptors.key,
                    descriptors.energy,
                    ResolutionStatus::ResolvedAudio,
                    ResultSource::AudioAnalysis,
                )
            }
            Ok(Err(e)) => {
                warn!(track = %track.title, error = %e, "Preview analysis failed");
                AnalysisResult::unresolved(track, ResolutionStatus::AnalysisFailed)
            }
            Err(e) => {
                warn!(track = %track.title, error = %e, "Analysis task aborted");
                AnalysisResult::unresolved(track, ResolutionStatus::AnalysisFailed)
            }
        }
    }
}

//! Core Types and Trait Definitions for mixprep-analyzer
//!
//! The resolver and batch controller talk to their collaborators only
//! through the traits below, so every strategy can be swapped for a fake
//! in tests:
//! - `DescriptorLookup`: fast remote descriptor service
//! - `PreviewLocate`: catalog search for a preview clip
//! - `PreviewFetch`: preview download
//! - `AudioAnalyze`: CPU-bound local analysis (sync, run off the I/O threads)
//! - `TrackResolve`: per-track orchestration consumed by the batch controller
//! - `TrackCatalog`: external playlist source
//! - `ProgressSink`: external event consumer

use crate::error::{AnalysisError, FetchError, SetupError};
use mixprep_common::{AnalysisResult, ProgressEvent, TrackMetadata};
use std::time::Duration;
use tracing::warn;

/// Descriptor triple produced by either strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptors {
    /// Normalized tempo, 0 when undetermined
    pub bpm: f64,
    /// Camelot label or the unknown sentinel
    pub key: String,
    /// Energy, nominally 0-100
    pub energy: f64,
}

/// Reference to a located preview clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewReference {
    pub url: String,
}

impl PreviewReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// File extension of the URL path, used as a decoder hint
    pub fn extension(&self) -> Option<&str> {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next()?;
        let (_, ext) = file.rsplit_once('.')?;
        (!ext.is_empty() && ext.len() <= 5).then_some(ext)
    }
}

/// Downloaded preview clip, held in memory
#[derive(Debug, Clone)]
pub struct PreviewPayload {
    pub bytes: Vec<u8>,
    /// Container hint (e.g. "m4a", "mp3")
    pub extension: Option<String>,
}

/// Remote descriptor lookup
///
/// Never fails: transport, parse and timeout failures all report `None`.
#[async_trait::async_trait]
pub trait DescriptorLookup: Send + Sync {
    async fn lookup(&self, track_id: &str) -> Option<Descriptors>;
}

/// Preview clip search
///
/// Never fails: exhausted retries and empty results both report `None`.
#[async_trait::async_trait]
pub trait PreviewLocate: Send + Sync {
    async fn locate(
        &self,
        artist: &str,
        title: &str,
        duration_ms: Option<u64>,
    ) -> Option<PreviewReference>;
}

/// Preview download
#[async_trait::async_trait]
pub trait PreviewFetch: Send + Sync {
    async fn fetch(&self, preview: &PreviewReference) -> Result<PreviewPayload, FetchError>;
}

/// Local signal analysis of a preview clip
///
/// Implementations are blocking and CPU-bound; callers dispatch them to
/// the blocking pool.
pub trait AudioAnalyze: Send + Sync {
    fn analyze(&self, payload: PreviewPayload) -> Result<Descriptors, AnalysisError>;
}

/// Per-track resolution consumed by the batch controller
///
/// Never fails: every outcome is encoded in the result's status.
#[async_trait::async_trait]
pub trait TrackResolve: Send + Sync {
    async fn resolve(&self, track: TrackMetadata) -> AnalysisResult;
}

/// External playlist source
#[async_trait::async_trait]
pub trait TrackCatalog: Send + Sync {
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackMetadata>, SetupError>;
}

/// Event delivery failure: the consumer is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Ordered, append-only consumer of progress events
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkClosed>;
}

/// Channel-backed sink
///
/// Back-pressure is the consumer's: a full channel suspends the batch until
/// the consumer reads again. A consumer that stalls longer than
/// `stall_warning` is logged; only a closed channel fails the send.
pub struct ChannelSink {
    sender: tokio::sync::mpsc::Sender<ProgressEvent>,
    stall_warning: Duration,
}

impl ChannelSink {
    pub fn new(sender: tokio::sync::mpsc::Sender<ProgressEvent>, stall_warning: Duration) -> Self {
        Self {
            sender,
            stall_warning,
        }
    }
}

#[async_trait::async_trait]
impl ProgressSink for ChannelSink {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkClosed> {
        use tokio::sync::mpsc::error::SendTimeoutError;

        let event = match self.sender.send_timeout(event, self.stall_warning).await {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Closed(_)) => return Err(SinkClosed),
            Err(SendTimeoutError::Timeout(event)) => event,
        };

        warn!(
            waited_ms = self.stall_warning.as_millis() as u64,
            event = event.event_type(),
            "Event consumer stalled, still waiting"
        );
        self.sender.send(event).await.map_err(|_| SinkClosed)
    }
}

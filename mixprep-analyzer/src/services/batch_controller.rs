//! Batch fan-out with streaming progress
//!
//! **Event sequence** for a batch that gets past setup:
//! 1. one `progress` event announcing the track count
//! 2. one `update` per track, in completion order, with a running percent
//! 3. one `done` event
//!
//! A setup failure (no track source, catalog failure) produces a single
//! `error` event instead. Cancellation, or a consumer that disconnects,
//! drops the in-flight tracks at their next suspension point and ends the
//! batch without a `done` event. A slow consumer only slows the batch down:
//! emitting waits for room in the channel.

use crate::config::BatchConfig;
use crate::error::SetupError;
use crate::types::{ChannelSink, ProgressSink, TrackCatalog, TrackResolve};
use futures::stream::{self, Stream, StreamExt};
use mixprep_common::{ProgressEvent, TrackMetadata};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Message of the final event
pub const DONE_MESSAGE: &str = "Analysis Complete";

/// Events buffered between the batch task and a stream consumer
const EVENT_BUFFER: usize = 64;

/// What the caller asked to analyze
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Previously fetched or produced tracks to (re-)analyze
    pub tracks: Vec<TrackMetadata>,
    /// Playlist link or bare id, used when `tracks` is empty
    pub playlist: Option<String>,
}

impl BatchRequest {
    pub fn tracks(tracks: Vec<TrackMetadata>) -> Self {
        Self {
            tracks,
            playlist: None,
        }
    }

    pub fn playlist(link: impl Into<String>) -> Self {
        Self {
            tracks: Vec::new(),
            playlist: Some(link.into()),
        }
    }

    /// Decide where the tracks come from; supplied tracks take precedence
    pub fn track_source(self) -> Result<TrackSource, SetupError> {
        if !self.tracks.is_empty() {
            return Ok(TrackSource::Provided(self.tracks));
        }
        match self.playlist {
            Some(link) if !link.trim().is_empty() => Ok(TrackSource::Playlist(link)),
            _ => Err(SetupError::NoTrackSource),
        }
    }
}

/// Resolved origin of a batch's tracks
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSource {
    Provided(Vec<TrackMetadata>),
    Playlist(String),
}

/// Extract a playlist id from a share link or bare id
///
/// `https://open.spotify.com/playlist/37i9dQZF1DX?si=abc` gives `37i9dQZF1DX`.
pub fn parse_playlist_id(link: &str) -> Result<String, SetupError> {
    let without_query = link.trim().split(['?', '#']).next().unwrap_or_default();
    let id = without_query.trim_end_matches('/').rsplit('/').next().unwrap_or_default();

    if id.is_empty() {
        return Err(SetupError::InvalidPlaylist(link.to_string()));
    }
    Ok(id.to_string())
}

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    Cancelled,
    SetupFailed,
}

/// Summary returned by [`BatchController::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub total: usize,
    /// Tracks whose update reached the sink
    pub completed: usize,
    pub status: BatchStatus,
}

/// Runs one batch of tracks through a resolver under a concurrency bound
pub struct BatchController {
    resolver: Arc<dyn TrackResolve>,
    catalog: Option<Arc<dyn TrackCatalog>>,
    config: BatchConfig,
}

impl BatchController {
    pub fn new(resolver: Arc<dyn TrackResolve>, config: BatchConfig) -> Self {
        Self {
            resolver,
            catalog: None,
            config,
        }
    }

    /// Attach the playlist catalog used for `TrackSource::Playlist`
    pub fn with_catalog(mut self, catalog: Arc<dyn TrackCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    async fn load_tracks(&self, request: BatchRequest) -> Result<(Vec<TrackMetadata>, String), SetupError> {
        match request.track_source()? {
            TrackSource::Provided(tracks) => {
                let message = format!("Re-analyzing {} tracks...", tracks.len());
                Ok((tracks, message))
            }
            TrackSource::Playlist(link) => {
                let playlist_id = parse_playlist_id(&link)?;
                let catalog = self
                    .catalog
                    .as_ref()
                    .ok_or_else(|| SetupError::Catalog("No playlist catalog configured".to_string()))?;
                let tracks = catalog.playlist_tracks(&playlist_id).await?;
                let message = format!("Found {} tracks. Starting analysis...", tracks.len());
                Ok((tracks, message))
            }
        }
    }

    /// Run a batch, emitting every event to `sink`
    pub async fn run(&self, request: BatchRequest, sink: &dyn ProgressSink, cancel: CancellationToken) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", batch_id = %batch_id);
        self.run_batch(batch_id, request, sink, cancel).instrument(span).await
    }

    async fn run_batch(
        &self,
        batch_id: Uuid,
        request: BatchRequest,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            batch_id,
            total: 0,
            completed: 0,
            status: BatchStatus::Completed,
        };

        let (tracks, announcement) = match self.load_tracks(request).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Batch setup failed");
                if sink.emit(ProgressEvent::error(e.to_string())).await.is_err() {
                    warn!("Event consumer gone, setup error not delivered");
                }
                outcome.status = BatchStatus::SetupFailed;
                return outcome;
            }
        };

        let total = tracks.len();
        outcome.total = total;
        info!(total, concurrency = self.config.concurrency, "Batch started");

        if sink.emit(ProgressEvent::progress(announcement)).await.is_err() {
            warn!("Event consumer gone before work started");
            cancel.cancel();
            outcome.status = BatchStatus::Cancelled;
            return outcome;
        }

        let stagger = self.config.stagger();
        let mut results = stream::iter(tracks)
            .map(|track| {
                let resolver = Arc::clone(&self.resolver);
                async move {
                    tokio::time::sleep(stagger).await;
                    resolver.resolve(track).await
                }
            })
            .buffer_unordered(self.config.concurrency.max(1));

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.status = BatchStatus::Cancelled;
                    break;
                }
                next = results.next() => match next {
                    Some(result) => result,
                    None => break,
                },
            };

            let completed = outcome.completed + 1;
            let status = result.status;
            let event = ProgressEvent::update(result, completed, total);
            // A stalled consumer is waited on, but cancellation still wins
            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.status = BatchStatus::Cancelled;
                    break;
                }
                delivered = sink.emit(event) => delivered,
            };
            if delivered.is_err() {
                warn!("Event consumer gone, cancelling batch");
                cancel.cancel();
                outcome.status = BatchStatus::Cancelled;
                break;
            }
            outcome.completed = completed;
            info!(completed, total, status = ?status, "Track finished");
        }

        if outcome.status == BatchStatus::Cancelled {
            info!(completed = outcome.completed, total, "Batch cancelled");
            return outcome;
        }

        if sink.emit(ProgressEvent::done(DONE_MESSAGE)).await.is_err() {
            warn!("Event consumer gone, completion event not delivered");
        }
        info!(total, "Batch complete");
        outcome
    }

    /// Run a batch on a background task and expose its events as a stream
    ///
    /// Dropping the stream cancels the batch.
    pub fn event_stream(
        self: Arc<Self>,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ProgressEvent> {
        let (tx, mut rx) = tokio::sync::mpsc::channel(EVENT_BUFFER);
        let batch_cancel = cancel.child_token();
        let sink = ChannelSink::new(tx, self.config.sink_stall_warning());

        async_stream::stream! {
            let _cancel_on_drop = batch_cancel.clone().drop_guard();
            let task = tokio::spawn(async move { self.run(request, &sink, batch_cancel).await });

            while let Some(event) = rx.recv().await {
                yield event;
            }

            if let Err(e) = task.await {
                warn!(error = %e, "Batch task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playlist_id() {
        assert_eq!(
            parse_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc123").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(parse_playlist_id("37i9dQZF1DX").unwrap(), "37i9dQZF1DX");
        assert_eq!(
            parse_playlist_id("https://open.spotify.com/playlist/abc/").unwrap(),
            "abc"
        );
        assert!(parse_playlist_id("?si=abc").is_err());
        assert!(parse_playlist_id("  ").is_err());
    }

    #[test]
    fn test_provided_tracks_take_precedence() {
        let request = BatchRequest {
            tracks: vec![TrackMetadata::new("A", "B")],
            playlist: Some("https://example.com/playlist/xyz".to_string()),
        };
        assert!(matches!(request.track_source(), Ok(TrackSource::Provided(t)) if t.len() == 1));
    }

    #[test]
    fn test_playlist_source() {
        let source = BatchRequest::playlist("https://example.com/playlist/xyz").track_source();
        assert_eq!(source.unwrap(), TrackSource::Playlist("https://example.com/playlist/xyz".to_string()));
    }

    #[test]
    fn test_no_source_is_setup_error() {
        let err = BatchRequest::default().track_source().unwrap_err();
        assert!(matches!(err, SetupError::NoTrackSource));
        assert_eq!(err.to_string(), "No playlist link or tracks provided.");

        let err = BatchRequest::playlist("   ").track_source().unwrap_err();
        assert!(matches!(err, SetupError::NoTrackSource));
    }
}

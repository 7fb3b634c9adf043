//! In-process fakes for the resolver and batch controller seams

use mixprep_analyzer::error::{AnalysisError, FetchError, SetupError};
use mixprep_analyzer::types::{
    AudioAnalyze, DescriptorLookup, Descriptors, PreviewFetch, PreviewLocate, PreviewPayload,
    PreviewReference, ProgressSink, SinkClosed, TrackCatalog, TrackResolve,
};
use mixprep_common::{AnalysisResult, ProgressEvent, ResolutionStatus, ResultSource, TrackMetadata};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn track(artist: &str, title: &str) -> TrackMetadata {
    TrackMetadata::new(artist, title)
}

pub fn descriptors(bpm: f64, key: &str, energy: f64) -> Descriptors {
    Descriptors {
        bpm,
        key: key.to_string(),
        energy,
    }
}

/// Descriptor lookup returning a fixed answer
pub struct FakeLookup {
    result: Option<Descriptors>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn hit(descriptors: Descriptors) -> Self {
        Self {
            result: Some(descriptors),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn miss() -> Self {
        Self {
            result: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DescriptorLookup for FakeLookup {
    async fn lookup(&self, track_id: &str) -> Option<Descriptors> {
        self.calls.lock().unwrap().push(track_id.to_string());
        self.result.clone()
    }
}

/// Preview locator returning a fixed answer
pub struct FakeLocator {
    result: Option<PreviewReference>,
    pub calls: AtomicUsize,
}

impl FakeLocator {
    pub fn found(url: &str) -> Self {
        Self {
            result: Some(PreviewReference::new(url)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn not_found() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl PreviewLocate for FakeLocator {
    async fn locate(&self, _artist: &str, _title: &str, _duration_ms: Option<u64>) -> Option<PreviewReference> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Preview fetcher that either returns fixed bytes or fails
pub struct FakeFetcher {
    bytes: Option<Vec<u8>>,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn ok(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            bytes: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl PreviewFetch for FakeFetcher {
    async fn fetch(&self, preview: &PreviewReference) -> Result<PreviewPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.bytes {
            Some(bytes) => Ok(PreviewPayload {
                bytes: bytes.clone(),
                extension: preview.extension().map(str::to_string),
            }),
            None => Err(FetchError::Status(503)),
        }
    }
}

/// Analyzer with a fixed outcome
pub struct FakeAnalyzer {
    result: Option<Descriptors>,
    pub calls: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn ok(descriptors: Descriptors) -> Self {
        Self {
            result: Some(descriptors),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl AudioAnalyze for FakeAnalyzer {
    fn analyze(&self, _payload: PreviewPayload) -> Result<Descriptors, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .ok_or_else(|| AnalysisError::Decode("not audio".to_string()))
    }
}

/// Sink collecting every event; optionally refuses after `accept_limit`
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
    accept_limit: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            accept_limit: None,
        }
    }

    pub fn closing_after(accept_limit: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            accept_limit: Some(accept_limit),
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ProgressSink for RecordingSink {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkClosed> {
        let mut events = self.events.lock().unwrap();
        if self.accept_limit.is_some_and(|limit| events.len() >= limit) {
            return Err(SinkClosed);
        }
        events.push(event);
        Ok(())
    }
}

/// Playlist catalog with fixed contents
pub struct FakeCatalog {
    tracks: Option<Vec<TrackMetadata>>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with_tracks(tracks: Vec<TrackMetadata>) -> Self {
        Self {
            tracks: Some(tracks),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            tracks: None,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl TrackCatalog for FakeCatalog {
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackMetadata>, SetupError> {
        self.requested.lock().unwrap().push(playlist_id.to_string());
        self.tracks
            .clone()
            .ok_or_else(|| SetupError::Catalog("Playlist not found".to_string()))
    }
}

/// Resolver that sleeps per track and records peak concurrency
///
/// Tracks titled "fail" resolve as `DOWNLOAD_FAILED`; a `delay_ms` extra
/// field overrides the default delay.
pub struct ConcurrencyProbe {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    pub started: AtomicUsize,
    default_delay: Duration,
}

impl ConcurrencyProbe {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            default_delay,
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TrackResolve for ConcurrencyProbe {
    async fn resolve(&self, track: TrackMetadata) -> AnalysisResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = track
            .extra
            .get("delay_ms")
            .and_then(|v| v.as_u64())
            .map(Duration::from_millis)
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if track.title == "fail" {
            AnalysisResult::unresolved(track, ResolutionStatus::DownloadFailed)
        } else {
            AnalysisResult::resolved(
                track,
                120.0,
                "8B",
                50.0,
                ResolutionStatus::ResolvedAudio,
                ResultSource::AudioAnalysis,
            )
        }
    }
}

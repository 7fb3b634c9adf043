//! Error types for mixprep-analyzer
//!
//! Failures inside one track never cross the track boundary: the resolver
//! turns every one of these into a `ResolutionStatus`. Only `SetupError`
//! is surfaced to the batch consumer.

use thiserror::Error;

/// Local signal analysis errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Bytes could not be decoded as audio
    #[error("Decode error: {0}")]
    Decode(String),

    /// Decoded audio could not be analyzed (too short, resampler failure, ...)
    #[error("Analysis error: {0}")]
    Numeric(String),
}

/// Preview search errors (recovered inside the locator)
#[derive(Debug, Error)]
pub enum SearchError {
    /// Catalog answered 403/429
    #[error("Rate limited (HTTP {0})")]
    RateLimited(u16),

    /// Connection, timeout or body read failure
    #[error("Network error: {0}")]
    Transport(String),

    /// Catalog returned a non-success status other than a rate limit
    #[error("Search API error {0}")]
    Status(u16),

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SearchError {
    /// Errors worth another attempt within the retry budget
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::RateLimited(_) | SearchError::Transport(_) | SearchError::Parse(_)
        )
    }
}

/// Remote descriptor lookup errors (logged, then reported as a miss)
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Descriptor API error {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Preview download errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Preview download returned HTTP {0}")]
    Status(u16),

    #[error("Preview exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Batch setup errors, fatal to the whole run
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("No playlist link or tracks provided.")]
    NoTrackSource,

    #[error("Invalid playlist reference: {0}")]
    InvalidPlaylist(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("HTTP session setup failed: {0}")]
    Session(String),
}

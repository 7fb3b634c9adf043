//! mixprep-analyzer library interface
//!
//! Resolves tempo, Camelot key and energy for batches of tracks: a fast
//! remote descriptor lookup first, then preview download and local signal
//! analysis as the fallback. Progress is streamed per completed track.

pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::config::AnalyzerConfig;
pub use crate::error::{AnalysisError, FetchError, LookupError, SearchError, SetupError};
pub use crate::services::{BatchController, BatchOutcome, BatchRequest, BatchStatus, TrackResolver};

use std::sync::Arc;

/// Build a batch controller over the network-backed strategies
///
/// All strategies share one HTTP client, reused by every batch the
/// controller runs. Its connections close when the controller and every
/// stream built from it are dropped.
pub fn build_controller(config: &AnalyzerConfig) -> Result<BatchController, SetupError> {
    let http_client = services::build_http_client()?;
    let resolver = TrackResolver::from_config(http_client, config);
    Ok(BatchController::new(Arc::new(resolver), config.batch.clone()))
}

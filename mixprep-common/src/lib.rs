//! # mixprep Common Library
//!
//! Shared code for the mixprep crates including:
//! - Track and analysis result models
//! - Camelot key notation
//! - Progress event types (ProgressEvent enum)
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod model;

pub use error::{Error, Result};
pub use events::ProgressEvent;
pub use model::{AnalysisResult, CamelotKey, Mode, ResolutionStatus, ResultSource, TrackMetadata, UNKNOWN_KEY};

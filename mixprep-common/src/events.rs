//! Progress event types emitted while a batch runs
//!
//! Events are serialized as internally tagged JSON objects (`"type"` field).
//! The wire names (`msg`, `track`, `percent`) are what downstream UIs read.

use serde::{Deserialize, Serialize};

use crate::model::AnalysisResult;

/// Batch progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Batch-level status before work starts
    Progress {
        #[serde(rename = "msg")]
        message: String,
    },

    /// One track finished (any status)
    Update {
        #[serde(rename = "track")]
        result: AnalysisResult,
        #[serde(rename = "percent")]
        percent_complete: u8,
        #[serde(rename = "msg")]
        message: String,
    },

    /// Every track of the batch has completed
    Done {
        #[serde(rename = "msg")]
        message: String,
    },

    /// Batch setup failed; no track was started
    Error {
        #[serde(rename = "msg")]
        message: String,
    },
}

impl ProgressEvent {
    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
        }
    }

    /// Build the update event for the `completed`-th finished track of `total`
    pub fn update(result: AnalysisResult, completed: usize, total: usize) -> Self {
        let message = format!("Analyzed {}/{}: {}", completed, total, result.title());
        Self::Update {
            result,
            percent_complete: percent_complete(completed, total),
            message,
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self::Done {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Get event type as string (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Update { .. } => "update",
            ProgressEvent::Done { .. } => "done",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// True for the two events that end a batch stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Done { .. } | ProgressEvent::Error { .. })
    }
}

/// `round(completed / total * 100)`, clamped to 0-100
pub fn percent_complete(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (completed as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

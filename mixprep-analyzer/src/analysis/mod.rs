//! Local signal analysis
//!
//! Pure DSP over decoded mono samples: tempo from an onset envelope, key
//! from a pitch-class profile, energy from short-window RMS.

pub mod bpm;
pub mod chroma;
pub mod energy;
pub mod key_estimator;
pub mod signal_analyzer;
pub mod spectrum;
pub mod tempo;

pub use bpm::normalize_bpm;
pub use key_estimator::{estimate_key, estimate_key_with_score, KeyEstimate};
pub use signal_analyzer::SignalAnalyzer;

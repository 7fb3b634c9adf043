//! Local descriptor extraction from a preview clip

use super::bpm::normalize_bpm;
use super::chroma::pitch_class_profile;
use super::energy::energy_score;
use super::key_estimator::estimate_key_with_score;
use super::tempo::estimate_tempo;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::{AudioAnalyze, Descriptors, PreviewPayload};
use crate::utils::audio_decoder::decode_preview;
use std::time::Instant;
use tracing::debug;

/// Tempo, key and energy from decoded audio
///
/// Blocking and CPU-bound: the resolver runs it on the blocking pool.
#[derive(Debug, Clone)]
pub struct SignalAnalyzer {
    config: AnalysisConfig,
}

impl SignalAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Analyze mono samples already at `sample_rate`
    pub fn analyze_samples(&self, samples: &[f32], sample_rate: u32) -> Result<Descriptors, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::Numeric("No samples to analyze".to_string()));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(AnalysisError::Numeric("Non-finite sample in decoded audio".to_string()));
        }

        let frame_size = self.config.frame_size;
        let hop_size = self.config.hop_size;

        let raw_tempo = estimate_tempo(samples, sample_rate, frame_size, hop_size);
        let bpm = normalize_bpm(raw_tempo.unwrap_or(0.0));

        let profile = pitch_class_profile(samples, sample_rate);
        let key = estimate_key_with_score(&profile);

        let energy = energy_score(samples, frame_size, hop_size, self.config.energy_scale);

        debug!(
            raw_tempo = ?raw_tempo,
            bpm,
            key = %key.key,
            key_correlation = key.correlation,
            energy,
            "Signal analysis complete"
        );

        Ok(Descriptors {
            bpm,
            key: key.key.to_string(),
            energy,
        })
    }
}

impl AudioAnalyze for SignalAnalyzer {
    fn analyze(&self, payload: PreviewPayload) -> Result<Descriptors, AnalysisError> {
        let start = Instant::now();
        let size = payload.bytes.len();

        let decoded = decode_preview(
            payload.bytes,
            payload.extension.as_deref(),
            self.config.sample_rate,
            self.config.max_duration_secs,
        )?;

        debug!(
            bytes = size,
            seconds = %format!("{:.2}", decoded.duration_seconds()),
            source_rate = decoded.source_sample_rate,
            "Decoded preview for analysis"
        );

        let descriptors = self.analyze_samples(&decoded.samples, decoded.sample_rate)?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Preview analyzed");
        Ok(descriptors)
    }
}

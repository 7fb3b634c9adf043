//! Aggregate tempo estimation
//!
//! 1. Onset strength: half-wave rectified spectral flux of the
//!    log-compressed magnitude spectrum.
//! 2. Periodicity: autocorrelation of the mean-removed onset envelope over
//!    lags covering 30-300 BPM.
//! 3. Selection: each lag is weighted by a log-normal prior centered on
//!    120 BPM (one octave deviation), the best lag is refined by parabolic
//!    interpolation and converted back to BPM.
//!
//! The result is a raw tempo; octave folding happens in `bpm::normalize_bpm`.

use super::spectrum::Stft;

/// Slowest tempo considered
const MIN_TEMPO: f64 = 30.0;

/// Fastest tempo considered
const MAX_TEMPO: f64 = 300.0;

/// Center of the tempo prior
const PRIOR_CENTER_BPM: f64 = 120.0;

/// Prior width in octaves
const PRIOR_STD_OCTAVES: f64 = 1.0;

/// Magnitude compression factor for the onset envelope
const LOG_COMPRESSION: f32 = 100.0;

/// Estimate the dominant tempo of `samples` in BPM
///
/// Returns `None` when the clip is too short to hold two beat periods or
/// has no periodic onset structure (silence, steady tones).
pub fn estimate_tempo(samples: &[f32], sample_rate: u32, frame_size: usize, hop_size: usize) -> Option<f64> {
    if sample_rate == 0 || hop_size == 0 {
        return None;
    }

    let envelope = onset_envelope(samples, frame_size, hop_size);
    let frame_rate = sample_rate as f64 / hop_size as f64;

    let min_lag = (60.0 * frame_rate / MAX_TEMPO).ceil().max(1.0) as usize;
    let max_lag = ((60.0 * frame_rate / MIN_TEMPO).floor() as usize).min(envelope.len() / 2);
    if max_lag <= min_lag + 1 {
        tracing::trace!(frames = envelope.len(), "Onset envelope too short for tempo estimation");
        return None;
    }

    let acf = autocorrelation(&envelope, max_lag + 1);

    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag {
        if acf[lag] <= 0.0 {
            continue;
        }
        let bpm = 60.0 * frame_rate / lag as f64;
        let score = acf[lag] * tempo_prior(bpm);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let (lag, _) = best?;
    let refined_lag = lag as f64 + parabolic_offset(&acf, lag);
    let tempo = 60.0 * frame_rate / refined_lag;

    tracing::trace!(lag, refined_lag, tempo, "Tempo estimate");
    tempo.is_finite().then_some(tempo)
}

/// Spectral flux onset strength, one value per STFT frame
fn onset_envelope(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f64> {
    let stft = Stft::new(frame_size, hop_size);
    let mut envelope = Vec::with_capacity(stft.frame_count(samples.len()));
    let mut previous: Option<Vec<f32>> = None;

    stft.for_each_frame(samples, |power| {
        let current: Vec<f32> = power
            .iter()
            .map(|p| (1.0 + LOG_COMPRESSION * p.sqrt()).ln())
            .collect();

        let flux = match &previous {
            Some(prev) => current
                .iter()
                .zip(prev.iter())
                .map(|(c, p)| (c - p).max(0.0) as f64)
                .sum(),
            None => 0.0,
        };

        envelope.push(flux);
        previous = Some(current);
    });

    envelope
}

/// Autocorrelation of the mean-removed signal for lags `0..lags`
fn autocorrelation(signal: &[f64], lags: usize) -> Vec<f64> {
    let mean = signal.iter().sum::<f64>() / signal.len().max(1) as f64;
    let centered: Vec<f64> = signal.iter().map(|x| x - mean).collect();

    (0..lags)
        .map(|lag| {
            centered
                .iter()
                .zip(centered.iter().skip(lag))
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Log-normal tempo weighting
fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_STD_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Sub-lag peak position from the two neighbors, in `[-0.5, 0.5]`
fn parabolic_offset(acf: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag + 1 >= acf.len() {
        return 0.0;
    }
    let (a, b, c) = (acf[lag - 1], acf[lag], acf[lag + 1]);
    let denominator = a - 2.0 * b + c;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (0.5 * (a - c) / denominator).clamp(-0.5, 0.5)
}

//! RMS energy score

/// Mean short-window RMS of `samples`, multiplied by `scale` and rounded to
/// one decimal place
///
/// With full-scale input in `[-1, 1]` and a scale of 100 the result lands in
/// 0-100. A clip shorter than one window is measured as a single window.
pub fn energy_score(samples: &[f32], frame_size: usize, hop_size: usize, scale: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let frame_size = frame_size.max(1);
    let hop_size = hop_size.max(1);

    let mut total = 0.0f64;
    let mut frames = 0usize;
    let mut start = 0usize;
    loop {
        let end = (start + frame_size).min(samples.len());
        total += frame_rms(&samples[start..end]);
        frames += 1;
        if end == samples.len() {
            break;
        }
        start += hop_size;
    }

    let mean_rms = total / frames as f64;
    (mean_rms * scale * 10.0).round() / 10.0
}

fn frame_rms(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(amplitude: f32, seconds: f32) -> Vec<f32> {
        let sample_rate = 22_050.0;
        (0..(sample_rate * seconds) as usize)
            .map(|i| amplitude * (2.0 * PI * 440.0 * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_silence_scores_zero() {
        assert_eq!(energy_score(&[], 2048, 512, 100.0), 0.0);
        assert_eq!(energy_score(&vec![0.0; 10_000], 2048, 512, 100.0), 0.0);
    }

    #[test]
    fn test_sine_rms() {
        // RMS of a sine is amplitude / sqrt(2)
        let energy = energy_score(&sine(0.5, 3.0), 2048, 512, 100.0);
        assert!((energy - 35.4).abs() < 0.5, "got {}", energy);
    }

    #[test]
    fn test_louder_is_higher() {
        let quiet = energy_score(&sine(0.1, 1.0), 2048, 512, 100.0);
        let loud = energy_score(&sine(0.8, 1.0), 2048, 512, 100.0);
        assert!(loud > quiet);
        assert!(loud <= 100.0);
    }

    #[test]
    fn test_short_clip_single_window() {
        let samples = vec![0.5f32; 100];
        assert_eq!(energy_score(&samples, 2048, 512, 100.0), 50.0);
    }

    #[test]
    fn test_scale_is_applied() {
        let samples = vec![0.25f32; 4096];
        assert_eq!(energy_score(&samples, 2048, 512, 100.0), 25.0);
        assert_eq!(energy_score(&samples, 2048, 512, 200.0), 50.0);
    }
}

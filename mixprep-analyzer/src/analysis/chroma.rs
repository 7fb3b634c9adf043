//! Pitch-class profile extraction
//!
//! Approximates a constant-Q chromagram: bins of a linear long-window STFT
//! are folded onto equal-tempered semitone bands (A4 = 440 Hz) between C2
//! and C7. Resolution is uneven. Near C2 a band spans only about 1.5 bins,
//! while bands near C7 cover dozens. Each frame is normalized by its
//! loudest pitch class before summing, so loud passages do not dominate
//! the clip-level profile.

use super::spectrum::Stft;

/// Chroma STFT length; long enough to separate semitones near C2 at 22.05 kHz
pub const CHROMA_FRAME_SIZE: usize = 8192;

/// Chroma STFT hop
pub const CHROMA_HOP_SIZE: usize = 2048;

/// Lowest MIDI note folded into the profile (C2, ~65 Hz)
const MIN_MIDI_NOTE: f64 = 36.0;

/// Highest MIDI note folded into the profile (C7, ~2093 Hz)
const MAX_MIDI_NOTE: f64 = 96.0;

/// Frames quieter than this carry no pitch information
const SILENCE_FLOOR: f32 = 1e-10;

/// Sum the per-frame chromagram of `samples` into a 12-bin profile (index 0 = C)
pub fn pitch_class_profile(samples: &[f32], sample_rate: u32) -> [f64; 12] {
    let stft = Stft::new(CHROMA_FRAME_SIZE, CHROMA_HOP_SIZE);
    let bands = semitone_bands(&stft, sample_rate);

    let mut profile = [0.0f64; 12];
    stft.for_each_frame(samples, |power| {
        let mut frame = [0.0f32; 12];
        for (p, band) in power.iter().zip(bands.iter()) {
            if let Some(pitch_class) = band {
                frame[*pitch_class] += *p;
            }
        }

        let peak = frame.iter().copied().fold(0.0f32, f32::max);
        if peak > SILENCE_FLOOR {
            for (total, value) in profile.iter_mut().zip(frame.iter()) {
                *total += (*value / peak) as f64;
            }
        }
    });

    profile
}

/// Pitch class of each STFT bin, `None` outside the analyzed range
fn semitone_bands(stft: &Stft, sample_rate: u32) -> Vec<Option<usize>> {
    (0..stft.bins())
        .map(|bin| {
            let freq = stft.bin_frequency(bin, sample_rate);
            if freq <= 0.0 {
                return None;
            }
            let midi = (69.0 + 12.0 * (freq / 440.0).log2()).round();
            (MIN_MIDI_NOTE..=MAX_MIDI_NOTE)
                .contains(&midi)
                .then(|| (midi as i64).rem_euclid(12) as usize)
        })
        .collect()
}

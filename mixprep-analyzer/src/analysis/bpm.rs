//! Tempo normalization
//!
//! Raw tempo estimates are often off by an octave (half or double time).
//! Folding every estimate into one canonical octave makes values from the
//! remote service and from local analysis comparable.

/// Lower bound of the canonical tempo octave
pub const MIN_BPM: f64 = 90.0;

/// Upper bound of the canonical tempo octave
pub const MAX_BPM: f64 = 180.0;

/// Fold a raw tempo into `[90, 180]`, rounded to one decimal place
///
/// Zero, negative and non-finite inputs map to 0, the "undetermined"
/// sentinel.
pub fn normalize_bpm(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }

    let mut bpm = raw;
    while bpm < MIN_BPM {
        bpm *= 2.0;
    }
    while bpm > MAX_BPM {
        bpm /= 2.0;
    }

    (bpm * 10.0).round() / 10.0
}

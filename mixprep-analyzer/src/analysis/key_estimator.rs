//! Pitch-class profile to Camelot key
//!
//! The profile is correlated against binary diatonic templates, one per
//! root and mode (24 candidates). A minor template rotated to root `r + 9`
//! covers the same pitch set as the major template at root `r`, so a
//! relative pair always ties and the scan order resolves it toward the
//! major key. This is a coarse heuristic and intentionally not a
//! calibrated key profile.

use mixprep_common::{CamelotKey, Mode};

/// Diatonic major scale pattern starting at the tonic
const MAJOR_TEMPLATE: [f64; 12] = [1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

/// Natural minor scale pattern starting at the tonic
const MINOR_TEMPLATE: [f64; 12] = [1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0];

/// Best candidate found by [`estimate_key_with_score`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEstimate {
    pub key: CamelotKey,
    /// Pearson correlation of the winning candidate, in `[-1, 1]`
    pub correlation: f64,
}

/// Estimate the Camelot key of a 12-bin pitch-class profile (index 0 = C)
///
/// Total: every input, including the zero vector, yields a label.
pub fn estimate_key(profile: &[f64; 12]) -> CamelotKey {
    estimate_key_with_score(profile).key
}

/// Estimate the key and report the winning correlation
///
/// Candidates are scanned major roots 0..11, then minor roots 0..11. Only a
/// strictly greater correlation replaces the current best, so ties go to the
/// first candidate scanned.
pub fn estimate_key_with_score(profile: &[f64; 12]) -> KeyEstimate {
    let mut best = KeyEstimate {
        key: CamelotKey::from_root(0, Mode::Major),
        correlation: f64::NEG_INFINITY,
    };

    for (mode, template) in [(Mode::Major, &MAJOR_TEMPLATE), (Mode::Minor, &MINOR_TEMPLATE)] {
        for root in 0..12 {
            let rotated = rotate(template, root);
            let correlation = pearson_correlation(profile, &rotated);
            if correlation > best.correlation {
                best = KeyEstimate {
                    key: CamelotKey::from_root(root, mode),
                    correlation,
                };
            }
        }
    }

    if best.correlation == f64::NEG_INFINITY {
        best.correlation = 0.0;
    }
    best
}

/// Shift a template so its tonic lands on `root`
fn rotate(template: &[f64; 12], root: usize) -> [f64; 12] {
    let mut rotated = [0.0; 12];
    for (i, value) in rotated.iter_mut().enumerate() {
        *value = template[(i + 12 - root % 12) % 12];
    }
    rotated
}

/// Pearson correlation coefficient of two 12-bin vectors
///
/// Zero-variance inputs (silence, flat profiles) correlate as 0. Non-finite
/// inputs yield NaN, which never wins a strict comparison.
fn pearson_correlation(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let n = 12.0;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator < 1e-12 {
        0.0
    } else {
        cov / denominator
    }
}

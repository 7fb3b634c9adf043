//! Short-time Fourier transform shared by the chroma and onset stages

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Hann-windowed STFT producing one power spectrum per frame
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame_size: usize,
    hop_size: usize,
}

impl Stft {
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        let frame_size = frame_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);

        let window = (0..frame_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (frame_size - 1) as f32).cos()))
            .collect();

        Self {
            fft,
            window,
            frame_size,
            hop_size: hop_size.max(1),
        }
    }

    /// Number of non-redundant bins per spectrum
    pub fn bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Center frequency of `bin` in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f64 {
        bin as f64 * sample_rate as f64 / self.frame_size as f64
    }

    /// Number of frames `samples` produces; a clip shorter than one frame
    /// still yields a single zero-padded frame
    pub fn frame_count(&self, samples: usize) -> usize {
        if samples == 0 {
            0
        } else if samples <= self.frame_size {
            1
        } else {
            1 + (samples - self.frame_size).div_ceil(self.hop_size)
        }
    }

    /// Visit the power spectrum (`|X|^2`, length [`Stft::bins`]) of every frame
    pub fn for_each_frame<F>(&self, samples: &[f32], mut visit: F)
    where
        F: FnMut(&[f32]),
    {
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_size];
        let mut power = vec![0.0f32; self.bins()];

        for frame in 0..self.frame_count(samples.len()) {
            let start = frame * self.hop_size;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = samples.get(start + i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process(&mut buffer);

            for (p, x) in power.iter_mut().zip(buffer.iter()) {
                *p = x.norm_sqr();
            }
            visit(&power);
        }
    }
}

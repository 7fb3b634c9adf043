//! Audio Test Fixture Generator
//!
//! Builds in-memory WAV clips standing in for downloaded previews

use std::f32::consts::PI;
use std::io::Cursor;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub channels: u16,
    /// MIDI notes sounded together for the whole clip
    pub notes: Vec<u8>,
    /// Accent every beat at this tempo, if set
    pub bpm: Option<f32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 8.0,
            sample_rate: 44_100,
            channels: 2,
            // C major scale, C4..B4
            notes: vec![60, 62, 64, 65, 67, 69, 71],
            bpm: Some(120.0),
        }
    }
}

fn midi_frequency(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

/// Generate a 16-bit PCM WAV clip with the given configuration
pub fn generate_test_wav(config: &AudioConfig) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let total_frames = (config.duration_seconds * config.sample_rate as f32) as usize;
        let gain = 0.5 / config.notes.len().max(1) as f32;

        for i in 0..total_frames {
            let t = i as f32 / config.sample_rate as f32;
            let envelope = match config.bpm {
                Some(bpm) => {
                    let beat = 60.0 / bpm;
                    let phase = (t % beat) / beat;
                    0.4 + 0.6 * (-phase * 12.0).exp()
                }
                None => 1.0,
            };
            let tone: f32 = config
                .notes
                .iter()
                .map(|&n| (2.0 * PI * midi_frequency(n) * t).sin())
                .sum();
            let sample = (gain * envelope * tone * i16::MAX as f32) as i16;

            for _ in 0..config.channels {
                writer.write_sample(sample).unwrap();
            }
        }

        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_wav_header() {
        let bytes = generate_test_wav(&AudioConfig {
            duration_seconds: 1.0,
            ..Default::default()
        });
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 1 s of 16-bit stereo at 44.1 kHz plus header
        assert!(bytes.len() > 44_100 * 4);
    }
}

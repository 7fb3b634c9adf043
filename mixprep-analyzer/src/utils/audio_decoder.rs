//! Audio Decoding Utilities
//!
//! **Purpose:** Decode an in-memory preview clip to mono f32 PCM at the
//! analysis sample rate.
//!
//! Uses symphonia for format-agnostic decoding (AAC/M4A, MP3, WAV, ...) and
//! rubato for resampling.

use crate::error::AnalysisError;
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Original sample rate before resampling
    pub source_sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode the head of an in-memory clip to mono samples at `target_rate`
///
/// **Algorithm:**
/// 1. Probe the container (extension used as a hint when known)
/// 2. Decode packets of the first audio track, mixing each to mono, until
///    `max_duration_secs` of audio has been collected
/// 3. Resample to `target_rate` with a sinc resampler
///
/// Corrupt packets are skipped; a clip with no decodable audio at all is a
/// `Decode` error.
pub fn decode_preview(
    bytes: Vec<u8>,
    extension: Option<&str>,
    target_rate: u32,
    max_duration_secs: f64,
) -> Result<DecodedAudio, AnalysisError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AnalysisError::Decode(format!("Unrecognized audio container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Decode("No audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::Decode(format!("Unsupported codec: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                if mono.is_empty() {
                    return Err(AnalysisError::Decode(format!("Error reading packet: {}", e)));
                }
                tracing::debug!(error = %e, "Stopping decode at unreadable packet");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped_packets += 1;
                tracing::trace!(error = %e, "Skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(AnalysisError::Decode(format!("Decoder failure: {}", e))),
        };

        if sample_rate == 0 {
            sample_rate = decoded.spec().rate;
        }
        if channels == 0 {
            channels = decoded.spec().channels.count();
        }

        mix_to_mono(&decoded, &mut mono);

        let max_samples = (max_duration_secs * sample_rate as f64).ceil() as usize;
        if sample_rate > 0 && mono.len() >= max_samples {
            mono.truncate(max_samples);
            break;
        }
    }

    if mono.is_empty() || sample_rate == 0 {
        return Err(AnalysisError::Decode("No decodable audio in clip".to_string()));
    }

    tracing::debug!(
        sample_rate,
        channels,
        samples = mono.len(),
        skipped_packets,
        "Preview decoded"
    );

    let samples = if sample_rate == target_rate {
        mono
    } else {
        resample_mono(mono, sample_rate, target_rate)?
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate,
        channels,
        source_sample_rate: sample_rate,
    })
}

/// Append the channel average of `decoded` to `out`
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_buffer(buf, out),
        AudioBufferRef::U16(buf) => mix_buffer(buf, out),
        AudioBufferRef::U24(buf) => mix_buffer(buf, out),
        AudioBufferRef::U32(buf) => mix_buffer(buf, out),
        AudioBufferRef::S8(buf) => mix_buffer(buf, out),
        AudioBufferRef::S16(buf) => mix_buffer(buf, out),
        AudioBufferRef::S24(buf) => mix_buffer(buf, out),
        AudioBufferRef::S32(buf) => mix_buffer(buf, out),
        AudioBufferRef::F32(buf) => mix_buffer(buf, out),
        AudioBufferRef::F64(buf) => mix_buffer(buf, out),
    }
}

fn mix_buffer<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count().max(1);
    out.reserve(buf.frames());

    for frame_idx in 0..buf.frames() {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        out.push(sum / num_channels as f32);
    }
}

/// Resample a mono signal in a single pass with rubato `SincFixedIn`
fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    let resample_ratio = target_rate as f64 / source_rate as f64;

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(resample_ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| AnalysisError::Numeric(format!("Failed to create resampler: {}", e)))?;

    let output = resampler
        .process(&[samples], None)
        .map_err(|e| AnalysisError::Numeric(format!("Resampling failed: {}", e)))?;

    output
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::Numeric("Resampler produced no channels".to_string()))
}

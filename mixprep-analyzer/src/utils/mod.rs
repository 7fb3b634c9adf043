//! Utility modules for mixprep-analyzer

pub mod audio_decoder;

pub use audio_decoder::{decode_preview, DecodedAudio};

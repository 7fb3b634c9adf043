//! Test Helper Utilities
//!
//! Shared utilities for testing mixprep-analyzer

#![allow(dead_code)]

pub mod audio_generator;
pub mod fakes;
pub mod log_capture;
pub mod stub_server;

// Re-export commonly used items
pub use audio_generator::{generate_test_wav, AudioConfig};
pub use fakes::{
    descriptors, track, ConcurrencyProbe, FakeAnalyzer, FakeCatalog, FakeFetcher, FakeLocator, FakeLookup,
    RecordingSink,
};
pub use log_capture::LogCapture;
pub use stub_server::{spawn_stub, Reply, ScriptedEndpoint};

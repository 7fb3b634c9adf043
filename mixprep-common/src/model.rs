//! Track and analysis result models
//!
//! `TrackMetadata` is the caller-supplied input for one track, `AnalysisResult`
//! is the per-track output carrying the resolved descriptors. Both serialize
//! to flat JSON objects so arbitrary pass-through fields survive a round trip
//! through a downstream UI.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Key sentinel for "not determined"
pub const UNKNOWN_KEY: &str = "?";

/// Descriptor fields owned by `AnalysisResult`.
///
/// Pass-through fields with these names are dropped when a result is built,
/// otherwise a re-analyzed track would serialize duplicate keys.
pub const DESCRIPTOR_FIELDS: [&str; 5] = ["bpm", "key", "energy", "status", "source"];

/// Immutable metadata for one track of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Catalog identifier (absent for user-supplied tracks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Primary artist name
    pub artist: String,
    /// Track title
    #[serde(rename = "name")]
    pub title: String,
    /// Track length reported by the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Arbitrary fields preserved into the result (artwork, uri, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackMetadata {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            artist: artist.into(),
            title: title.into(),
            duration_ms: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Catalog id, treating an empty string as absent
    pub fn catalog_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Terminal outcome of resolving one track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStatus {
    /// Descriptors came from the remote descriptor service
    ResolvedRemote,
    /// Descriptors came from local analysis of a preview clip
    ResolvedAudio,
    /// No preview clip could be located
    NoPreview,
    /// The preview was downloaded but could not be analyzed
    AnalysisFailed,
    /// The preview could not be downloaded
    DownloadFailed,
}

impl ResolutionStatus {
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::ResolvedRemote | Self::ResolvedAudio)
    }
}

/// Strategy that produced the descriptor values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    RemoteLookup,
    AudioAnalysis,
}

/// Per-track output: the input metadata plus resolved descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub track: TrackMetadata,
    /// Tempo in beats per minute, 0 when undetermined
    pub bpm: f64,
    /// Camelot label or the `"?"` sentinel
    pub key: String,
    /// Perceptual energy, nominally 0-100
    pub energy: f64,
    pub status: ResolutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResultSource>,
}

impl AnalysisResult {
    /// Build a result carrying resolved descriptors
    pub fn resolved(
        track: TrackMetadata,
        bpm: f64,
        key: impl Into<String>,
        energy: f64,
        status: ResolutionStatus,
        source: ResultSource,
    ) -> Self {
        Self {
            track: strip_descriptor_fields(track),
            bpm,
            key: key.into(),
            energy,
            status,
            source: Some(source),
        }
    }

    /// Build a result for a track that could not be resolved
    ///
    /// Descriptors are zeroed and the key is the unknown sentinel.
    pub fn unresolved(track: TrackMetadata, status: ResolutionStatus) -> Self {
        Self {
            track: strip_descriptor_fields(track),
            bpm: 0.0,
            key: UNKNOWN_KEY.to_string(),
            energy: 0.0,
            status,
            source: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.track.title
    }
}

fn strip_descriptor_fields(mut track: TrackMetadata) -> TrackMetadata {
    for field in DESCRIPTOR_FIELDS {
        track.extra.remove(field);
    }
    track
}

// ============================================================================
// Camelot notation
// ============================================================================

/// Key mode on the Camelot wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Minor keys, suffix `A`
    Minor,
    /// Major keys, suffix `B`
    Major,
}

impl Mode {
    pub fn suffix(self) -> char {
        match self {
            Mode::Minor => 'A',
            Mode::Major => 'B',
        }
    }
}

/// Camelot wheel position for each major root (0 = C, 1 = C#, ... 11 = B)
const MAJOR_POSITIONS: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];

/// Camelot wheel position for each minor root (0 = C, 1 = C#, ... 11 = B)
const MINOR_POSITIONS: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

/// One of the 24 Camelot wheel labels
///
/// Adjacent wheel positions are a perfect fifth apart; a minor key and its
/// relative major share a position and differ only in suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CamelotKey {
    position: u8,
    mode: Mode,
}

impl CamelotKey {
    /// Create a key from a wheel position (1-12) and mode
    pub fn new(position: u8, mode: Mode) -> Result<Self> {
        if !(1..=12).contains(&position) {
            return Err(Error::InvalidInput(format!(
                "Camelot position out of range: {}",
                position
            )));
        }
        Ok(Self { position, mode })
    }

    /// Map a pitch-class root (0 = C ... 11 = B) and mode to its label
    pub fn from_root(root: usize, mode: Mode) -> Self {
        let table = match mode {
            Mode::Major => &MAJOR_POSITIONS,
            Mode::Minor => &MINOR_POSITIONS,
        };
        Self {
            position: table[root % 12],
            mode,
        }
    }

    /// Pitch-class root of this key (inverse of `from_root`)
    pub fn root(&self) -> usize {
        let table = match self.mode {
            Mode::Major => &MAJOR_POSITIONS,
            Mode::Minor => &MINOR_POSITIONS,
        };
        table
            .iter()
            .position(|&p| p == self.position)
            .unwrap_or_default()
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// All 24 labels, majors then minors, in pitch-class order
    pub fn all() -> impl Iterator<Item = CamelotKey> {
        [Mode::Major, Mode::Minor]
            .into_iter()
            .flat_map(|mode| (0..12).map(move |root| CamelotKey::from_root(root, mode)))
    }

    /// Harmonic-mixing compatibility: same key, relative key, or one wheel
    /// step away in the same mode
    pub fn is_compatible(&self, other: &CamelotKey) -> bool {
        if self.position == other.position {
            return true;
        }
        if self.mode != other.mode {
            return false;
        }
        let diff = (self.position as i16 - other.position as i16).rem_euclid(12);
        diff == 1 || diff == 11
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.position, self.mode.suffix())
    }
}

impl FromStr for CamelotKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidInput(format!("Not a Camelot key: {:?}", s));

        let suffix = s.chars().last().ok_or_else(invalid)?;
        let mode = match suffix.to_ascii_uppercase() {
            'A' => Mode::Minor,
            'B' => Mode::Major,
            _ => return Err(invalid()),
        };
        let digits = &s[..s.len() - suffix.len_utf8()];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let position: u8 = digits.parse().map_err(|_| invalid())?;
        Self::new(position, mode).map_err(|_| invalid())
    }
}

impl TryFrom<String> for CamelotKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CamelotKey> for String {
    fn from(key: CamelotKey) -> Self {
        key.to_string()
    }
}

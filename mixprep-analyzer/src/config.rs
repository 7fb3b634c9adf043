//! Configuration resolution for mixprep-analyzer
//!
//! Every tunable (attempt counts, backoff, timeouts, concurrency width,
//! analysis constants) lives in one `AnalyzerConfig` passed to each
//! component at construction.
//!
//! **Priority:** CLI → ENV → TOML → built-in defaults

use mixprep_common::config::{load_toml_config, LoggingConfig};
use mixprep_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the descriptor API key
pub const LOOKUP_API_KEY_ENV: &str = "MIXPREP_LOOKUP_API_KEY";

/// Environment variable overriding the batch concurrency width
pub const CONCURRENCY_ENV: &str = "MIXPREP_CONCURRENCY";

/// Complete analyzer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub logging: LoggingConfig,
    pub batch: BatchConfig,
    pub search: SearchConfig,
    pub lookup: LookupConfig,
    pub download: DownloadConfig,
    pub analysis: AnalysisConfig,
}

/// Batch fan-out settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Tracks in flight at once (sized for third-party rate limits)
    pub concurrency: usize,
    /// Delay after admission before a track starts
    pub stagger_ms: u64,
    /// Wait on a full event channel before logging a stalled consumer
    pub sink_stall_warning_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            stagger_ms: 50,
            sink_stall_warning_ms: 10_000,
        }
    }
}

impl BatchConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn sink_stall_warning(&self) -> Duration {
        Duration::from_millis(self.sink_stall_warning_ms)
    }
}

/// Preview search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Catalog search endpoint
    pub endpoint: String,
    /// Candidates requested per search
    pub result_limit: u32,
    /// Total attempts per search (rate limits and transient errors share it)
    pub max_attempts: u32,
    /// Rate-limit backoff is `backoff_unit * backoff_base^attempt`
    pub backoff_base: f64,
    pub backoff_unit_ms: u64,
    /// Pause after a transport or parse failure
    pub transient_pause_ms: u64,
    /// Tier 1 duration match window
    pub strict_tolerance_ms: u64,
    /// Tier 2 duration match window
    pub relaxed_tolerance_ms: u64,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://itunes.apple.com/search".to_string(),
            result_limit: 5,
            max_attempts: 3,
            backoff_base: 2.0,
            backoff_unit_ms: 1000,
            transient_pause_ms: 1000,
            strict_tolerance_ms: 4000,
            relaxed_tolerance_ms: 10_000,
            timeout_secs: 10,
        }
    }
}

impl SearchConfig {
    /// Delay after the rate-limited attempt number `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.max(1.0).powi(attempt as i32);
        Duration::from_secs_f64(self.backoff_unit_ms as f64 * factor / 1000.0)
    }

    pub fn transient_pause(&self) -> Duration {
        Duration::from_millis(self.transient_pause_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Remote descriptor service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    /// Value of the `x-rapidapi-host` header
    pub api_host: String,
    /// Opaque credential, passed through as-is
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Energy reported when the service omits it
    pub default_energy: f64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://track-analysis.p.rapidapi.com".to_string(),
            api_host: "track-analysis.p.rapidapi.com".to_string(),
            api_key: None,
            timeout_secs: 5,
            default_energy: 50.0,
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Preview download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub max_bytes: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local signal analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// All clips are resampled to this rate before analysis
    pub sample_rate: u32,
    /// Only the head of the clip is decoded
    pub max_duration_secs: f64,
    /// Mean RMS (0-1 amplitude) is multiplied by this to land near 0-100.
    /// A tuning constant, not a calibrated loudness scale.
    pub energy_scale: f64,
    /// STFT frame length in samples
    pub frame_size: usize,
    /// STFT hop in samples
    pub hop_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            max_duration_secs: 30.0,
            energy_scale: 100.0,
            frame_size: 2048,
            hop_size: 512,
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub concurrency: Option<usize>,
    pub lookup_api_key: Option<String>,
}

impl AnalyzerConfig {
    /// Check invariants the components rely on
    pub fn validate(&self) -> Result<()> {
        if self.batch.concurrency == 0 {
            return Err(Error::Config("batch.concurrency must be at least 1".to_string()));
        }
        if self.search.max_attempts == 0 {
            return Err(Error::Config("search.max_attempts must be at least 1".to_string()));
        }
        if self.search.strict_tolerance_ms > self.search.relaxed_tolerance_ms {
            return Err(Error::Config(
                "search.strict_tolerance_ms must not exceed search.relaxed_tolerance_ms".to_string(),
            ));
        }
        if self.analysis.sample_rate == 0 {
            return Err(Error::Config("analysis.sample_rate must be positive".to_string()));
        }
        if self.analysis.hop_size == 0 || self.analysis.hop_size > self.analysis.frame_size {
            return Err(Error::Config(
                "analysis.hop_size must be in 1..=analysis.frame_size".to_string(),
            ));
        }
        if self.analysis.max_duration_secs <= 0.0 {
            return Err(Error::Config("analysis.max_duration_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from TOML, then apply environment and CLI overrides
pub fn resolve_config(toml_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<AnalyzerConfig> {
    let mut config: AnalyzerConfig = load_toml_config(toml_path)?;
    apply_overrides(&mut config, overrides, |name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Apply environment and CLI overrides on top of a loaded config
///
/// `env` is a lookup function so tests need not touch the process environment.
pub fn apply_overrides<F>(config: &mut AnalyzerConfig, overrides: &ConfigOverrides, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env(CONCURRENCY_ENV) {
        config.batch.concurrency = value.trim().parse().map_err(|_| {
            Error::Config(format!("{} is not a positive integer: {:?}", CONCURRENCY_ENV, value))
        })?;
    }
    if let Some(concurrency) = overrides.concurrency {
        config.batch.concurrency = concurrency;
    }

    config.lookup.api_key = resolve_lookup_api_key(
        overrides.lookup_api_key.as_deref(),
        env(LOOKUP_API_KEY_ENV).as_deref(),
        config.lookup.api_key.as_deref(),
    );

    Ok(())
}

/// Resolve the descriptor API key from the three tiers
///
/// **Priority:** CLI → ENV → TOML. A missing key is not an error: the
/// remote lookup is skipped and every track goes to audio analysis.
pub fn resolve_lookup_api_key(
    cli_key: Option<&str>,
    env_key: Option<&str>,
    toml_key: Option<&str>,
) -> Option<String> {
    let candidates = [
        ("command line", cli_key),
        ("environment", env_key),
        ("TOML", toml_key),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "Descriptor API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let (source, key) = candidates
        .into_iter()
        .find(|(_, key)| key.is_some_and(is_valid_key))?;

    info!("Descriptor API key loaded from {}", source);
    key.map(|k| k.trim().to_string())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

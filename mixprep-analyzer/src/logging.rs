//! Log subscriber setup
//!
//! The subscriber is installed before configuration is resolved so the
//! resolution itself is logged (config file, API key source). The level is
//! then narrowed to the TOML `[logging] level` through a reload handle,
//! unless `RUST_LOG` was set.

use mixprep_common::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Level used until the configuration is known
const BOOTSTRAP_LEVEL: &str = "info";

/// Handle for applying the configured level after startup
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogLevelHandle {
    /// Apply the configured level; `RUST_LOG` keeps precedence
    pub fn apply(&self, config: &LoggingConfig) {
        if self.from_env {
            return;
        }
        let filter = match EnvFilter::try_new(config.level.trim().to_lowercase()) {
            Ok(filter) => filter,
            Err(e) => {
                tracing::warn!(level = %config.level, error = %e, "Invalid log level in config, keeping default");
                return;
            }
        };
        if let Err(e) = self.handle.reload(filter) {
            tracing::warn!(error = %e, "Could not apply configured log level");
        }
    }

    /// Current filter directives
    pub fn current(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

/// Build the reloadable filter layer from an optional `RUST_LOG` value
pub fn filter_layer(env_directive: Option<&str>) -> (reload::Layer<EnvFilter, Registry>, LogLevelHandle) {
    let from_env_filter = env_directive.and_then(|directive| EnvFilter::try_new(directive).ok());
    let from_env = from_env_filter.is_some();
    let filter = from_env_filter.unwrap_or_else(|| EnvFilter::new(BOOTSTRAP_LEVEL));

    let (layer, handle) = reload::Layer::new(filter);
    (layer, LogLevelHandle { handle, from_env })
}

/// Install the global subscriber, writing to stderr
pub fn init() -> LogLevelHandle {
    let env_directive = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, handle) = filter_layer(env_directive.as_deref());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    handle
}

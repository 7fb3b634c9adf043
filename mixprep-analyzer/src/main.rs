//! mixprep-analyzer - batch tempo/key/energy resolution
//!
//! Reads a JSON array of tracks (file or stdin), resolves descriptors for
//! each and writes one progress event per line (NDJSON) to stdout. Logs go
//! to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use mixprep_analyzer::config::{resolve_config, ConfigOverrides};
use mixprep_analyzer::{build_controller, logging, BatchRequest};
use mixprep_common::config::resolve_config_path;
use mixprep_common::{ProgressEvent, TrackMetadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "mixprep-analyzer", version, about = "Resolve BPM, Camelot key and energy for a batch of tracks")]
struct Args {
    /// Config file (default: $MIXPREP_CONFIG or ~/.config/mixprep/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tracks analyzed concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Descriptor API key (overrides environment and config file)
    #[arg(long)]
    lookup_api_key: Option<String>,

    /// Playlist link, used when no tracks are given
    #[arg(long)]
    playlist: Option<String>,

    /// JSON array of tracks; `-` reads stdin
    tracks: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed first so config resolution is logged
    let log_level = logging::init();

    info!("Starting mixprep-analyzer");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config_path = resolve_config_path(args.config.as_deref());
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }
    let overrides = ConfigOverrides {
        concurrency: args.concurrency,
        lookup_api_key: args.lookup_api_key.clone(),
    };
    let config = resolve_config(config_path.as_deref(), &overrides).context("Invalid configuration")?;
    log_level.apply(&config.logging);

    let tracks = match &args.tracks {
        Some(path) => read_tracks(path).await?,
        None => Vec::new(),
    };
    let request = BatchRequest {
        tracks,
        playlist: args.playlist.clone(),
    };

    let controller = Arc::new(build_controller(&config).context("Failed to set up HTTP session")?);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling batch");
            ctrl_c_cancel.cancel();
        }
    });

    let mut events = Box::pin(controller.event_stream(request, cancel));
    let mut stdout = tokio::io::stdout();
    let mut setup_failed = false;

    while let Some(event) = events.next().await {
        setup_failed |= matches!(event, ProgressEvent::Error { .. });

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        if let Err(e) = write_line(&mut stdout, &line).await {
            warn!(error = %e, "Stdout closed, cancelling batch");
            break;
        }
    }
    drop(events);

    if setup_failed {
        anyhow::bail!("Batch setup failed");
    }
    Ok(())
}

async fn read_tracks(path: &Path) -> Result<Vec<TrackMetadata>> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read tracks from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    serde_json::from_str(&content).context("Tracks must be a JSON array of track objects")
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await
}

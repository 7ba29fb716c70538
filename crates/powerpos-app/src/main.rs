//! Power position reporting service - Entry Point
//!
//! Every interval, calculates the day-ahead hourly power position from the
//! trade source and writes it to a CSV file.

use anyhow::Result;
use clap::Parser;
use powerpos_app::{resolve_root, AppConfig, Application, CliOverrides};
use powerpos_core::{Clock, ReferenceClock};
use powerpos_telemetry::{init_logging, LoggingConfig, Metrics};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Scheduled intraday power position report
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via POWERPOS_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Folder the CSV reports are written to
    #[arg(short = 'p', long)]
    path: Option<PathBuf>,

    /// Minutes between reports
    #[arg(short = 't', long)]
    time: Option<u64>,

    /// First target time, "YYYY-MM-DD HH:MM" (seconds are ignored)
    #[arg(short = 'd', long)]
    date: Option<String>,

    /// Attempts per operation before giving up
    #[arg(short = 'r', long)]
    retries: Option<u32>,

    /// Pause between attempts in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            csv_dir: self.path.clone(),
            interval_minutes: self.time,
            start_time: self.date.clone(),
            max_attempts: self.retries,
            delay_ms: self.retry_delay_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Determine config path: CLI arg > POWERPOS_CONFIG env var > default
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("POWERPOS_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let mut config = AppConfig::load(&config_path)?;
    config.apply_overrides(&args.overrides());
    config.validate()?;

    let clock = Arc::new(ReferenceClock::new(config.timezone()?));

    // Initialize logging
    let logging = LoggingConfig {
        log_root: resolve_root(&config.logging.log_root)?,
        level: config.logging.level.clone(),
    };
    let log_path = init_logging(&logging, clock.now())?;

    info!("Starting powerpos v{}", env!("CARGO_PKG_VERSION"));
    info!(log_path = %log_path.display(), "Logging to file");
    if Path::new(&config_path).exists() {
        info!(config_path = %config_path, "Configuration loaded");
    } else {
        warn!(config_path = %config_path, "Config file not found, using defaults");
    }
    config.log_summary();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested by user (Ctrl+C)");
                cancel.cancel();
            }
        });
    }

    let app = Application::new(config, clock)?;
    let state = app.run(cancel).await?;

    info!(last_target = %state.target_time(), "Shutting down");
    match Metrics::render() {
        Ok(metrics) => debug!(%metrics, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to render metrics"),
    }

    Ok(())
}

//! Structured logging initialization.
//!
//! Every run gets its own log file under
//! `<root>/logs/<YYYY-MM-DD>/logs-<HH-MM-SS>.txt`, next to the usual console
//! output.

use crate::error::{TelemetryError, TelemetryResult};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Directory the `logs/` tree is created under.
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_log_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_level() -> String {
    "debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_root: default_log_root(),
            level: default_level(),
        }
    }
}

/// Path of the log file for a run started at `started_at`.
#[must_use]
pub fn log_file_path(root: &Path, started_at: DateTime<Tz>) -> PathBuf {
    root.join("logs")
        .join(started_at.format("%Y-%m-%d").to_string())
        .join(format!("logs-{}.txt", started_at.format("%H-%M-%S")))
}

/// Initialize console and file logging.
///
/// Console output is JSON when `RUST_ENV=production` and pretty otherwise.
/// The file layer is plain text without ANSI colors and is written through
/// unbuffered, so nothing is lost if the process is killed.
///
/// Returns the path of the log file.
pub fn init_logging(config: &LoggingConfig, started_at: DateTime<Tz>) -> TelemetryResult<PathBuf> {
    let path = log_file_path(&config.log_root, started_at);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid level: {e}")))?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let installed = if is_production {
        // JSON format for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        // Pretty format for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init()
    };
    installed.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    Ok(path)
}

//! Prometheus metrics and structured logging for the power position service.
//!
//! - Console plus per-run log file through `tracing`
//! - Prometheus counters for ticks and retry attempts
//! - A retry observer feeding both

pub mod error;
pub mod logging;
pub mod metrics;
pub mod observer;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, log_file_path, LoggingConfig};
pub use metrics::Metrics;
pub use observer::TelemetryObserver;

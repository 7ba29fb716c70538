//! Scheduled intraday power position reporting.
//!
//! Wires the components together:
//! - Trade source and parallel aggregation (retried on transient outages)
//! - CSV persistence (retried on I/O errors)
//! - Fixed-interval scheduler with overlapping ticks
//! - TOML configuration with CLI overrides

pub mod app;
pub mod config;
pub mod error;
pub mod paths;
pub mod scheduler;

pub use app::Application;
pub use config::{AppConfig, CliOverrides};
pub use error::{AppError, AppResult};
pub use paths::resolve_root;
pub use scheduler::{ScheduleState, Scheduler, TickOutcome, TickReport};

//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(#[from] powerpos_source::SourceError),

    #[error("Calculation error: {0}")]
    Calc(#[from] powerpos_calc::CalcError),

    #[error("Retry policy error: {0}")]
    Retry(#[from] powerpos_retry::RetryError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] powerpos_telemetry::TelemetryError),

    #[error("Core error: {0}")]
    Core(#[from] powerpos_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

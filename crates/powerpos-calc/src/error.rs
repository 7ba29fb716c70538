//! Calculation error types.

use powerpos_core::{Classify, CoreError, FailureKind};
use powerpos_source::SourceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Accumulator error: {0}")]
    Accumulator(#[from] CoreError),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    #[error("Invalid aggregation configuration: {0}")]
    InvalidConfig(String),

    #[error("Calculation cancelled")]
    Cancelled,
}

impl Classify for CalcError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Source(e) => e.kind(),
            Self::Accumulator(e) => e.kind(),
            Self::WorkerFailed(_) | Self::InvalidConfig(_) => FailureKind::Fatal,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

pub type CalcResult<T> = Result<T, CalcError>;

//! Source error types.

use powerpos_core::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The service is temporarily unavailable; worth retrying.
    #[error("Trade service unavailable: {0}")]
    Transient(String),

    #[error("Trade service error: {0}")]
    Fatal(String),

    #[error("Unexpected trade service response: {0}")]
    UnexpectedResult(String),

    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),

    #[error("Trade fetch cancelled")]
    Cancelled,
}

impl Classify for SourceError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Transient(_) => FailureKind::TransientSource,
            Self::Fatal(_) | Self::InvalidConfig(_) => FailureKind::Fatal,
            Self::UnexpectedResult(_) => FailureKind::UnexpectedResult,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

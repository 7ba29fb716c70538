//! Persistence error types.

use powerpos_core::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Position has {actual} periods, expected {expected}")]
    InvalidSnapshot { expected: usize, actual: usize },

    #[error("Write cancelled")]
    Cancelled,
}

impl Classify for PersistenceError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Io(_) => FailureKind::TransientSink,
            Self::InvalidSnapshot { .. } => FailureKind::UnexpectedResult,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

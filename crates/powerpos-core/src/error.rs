//! Error types for powerpos-core.

use crate::failure::{Classify, FailureKind};
use thiserror::Error;

/// Core error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Index {index} is out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Invalid accumulator length: {0} (must be greater than zero)")]
    InvalidLength(usize),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid local time: {0}")]
    InvalidLocalTime(String),
}

impl Classify for CoreError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::IndexOutOfRange { .. } => FailureKind::BoundsViolation,
            _ => FailureKind::Fatal,
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

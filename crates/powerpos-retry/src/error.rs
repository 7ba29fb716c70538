//! Retry error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("Invalid retry policy: {0}")]
    InvalidPolicy(String),
}

pub type RetryResult<T> = Result<T, RetryError>;

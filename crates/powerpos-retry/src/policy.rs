//! Retry policy: attempt budget, fixed delay and retryable failure kinds.

use crate::error::{RetryError, RetryResult};
use powerpos_core::FailureKind;
use std::time::Duration;

/// How many times to try, how long to wait, and which failures justify
/// another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    retryable: Vec<FailureKind>,
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// `Cancelled` is never retryable and is dropped from `retryable` if present.
    ///
    /// # Errors
    /// Returns [`RetryError::InvalidPolicy`] when `max_attempts` is zero.
    pub fn new(
        max_attempts: u32,
        delay: Duration,
        retryable: impl IntoIterator<Item = FailureKind>,
    ) -> RetryResult<Self> {
        if max_attempts == 0 {
            return Err(RetryError::InvalidPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let mut kinds: Vec<FailureKind> = Vec::new();
        for kind in retryable {
            if kind != FailureKind::Cancelled && !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        Ok(Self {
            max_attempts,
            delay,
            retryable: kinds,
        })
    }

    /// Single attempt, nothing retried.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            retryable: Vec::new(),
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn retryable_kinds(&self) -> &[FailureKind] {
        &self.retryable
    }

    /// Whether a failure of `kind` earns another attempt.
    #[must_use]
    pub fn is_retryable(&self, kind: FailureKind) -> bool {
        self.retryable.contains(&kind)
    }
}

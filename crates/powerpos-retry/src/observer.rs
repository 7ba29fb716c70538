//! Observability hook for the retry executor.
//!
//! The executor never logs through a global on its own behalf; it reports
//! structured events to whatever observer it was given.

use crate::outcome::ErrorRecord;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A step in the life of one retried operation.
#[derive(Debug, Clone, Copy)]
pub enum RetryEvent<'a> {
    /// An attempt is about to run.
    AttemptStarted {
        operation: &'a str,
        attempt: u32,
        max_attempts: u32,
    },
    /// An attempt failed; `retryable` tells whether the policy allows another.
    AttemptFailed {
        operation: &'a str,
        record: &'a ErrorRecord,
        retryable: bool,
    },
    /// Waiting before the next attempt.
    Backoff {
        operation: &'a str,
        attempt: u32,
        delay: Duration,
    },
    /// An attempt succeeded.
    Succeeded { operation: &'a str, attempt: u32 },
    /// The operation gave up; `errors` is the full history.
    Failed {
        operation: &'a str,
        errors: &'a [ErrorRecord],
    },
    /// Cancellation observed.
    Cancelled {
        operation: &'a str,
        attempts_started: u32,
    },
}

impl RetryEvent<'_> {
    /// Name of the operation the event belongs to.
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            Self::AttemptStarted { operation, .. }
            | Self::AttemptFailed { operation, .. }
            | Self::Backoff { operation, .. }
            | Self::Succeeded { operation, .. }
            | Self::Failed { operation, .. }
            | Self::Cancelled { operation, .. } => *operation,
        }
    }
}

/// Receives retry events.
pub trait RetryObserver: Send + Sync {
    fn on_event(&self, event: &RetryEvent<'_>);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {
    fn on_event(&self, _event: &RetryEvent<'_>) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_event(&self, event: &RetryEvent<'_>) {
        match *event {
            RetryEvent::AttemptStarted {
                operation,
                attempt,
                max_attempts,
            } => {
                debug!(operation, attempt, max_attempts, "Attempt starting");
            }
            RetryEvent::AttemptFailed {
                operation,
                record,
                retryable,
            } => {
                warn!(
                    operation,
                    attempt = record.attempt,
                    kind = %record.kind,
                    error = %record.description,
                    retryable,
                    "Attempt failed"
                );
            }
            RetryEvent::Backoff {
                operation,
                attempt,
                delay,
            } => {
                debug!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Waiting before next attempt"
                );
            }
            RetryEvent::Succeeded { operation, attempt } => {
                info!(operation, attempt, "Operation succeeded");
            }
            RetryEvent::Failed { operation, errors } => {
                error!(
                    operation,
                    attempts = errors.len(),
                    errors = ?errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "Operation failed, returning accumulated errors"
                );
            }
            RetryEvent::Cancelled {
                operation,
                attempts_started,
            } => {
                warn!(operation, attempts_started, "Operation cancelled");
            }
        }
    }
}

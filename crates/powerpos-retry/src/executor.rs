//! Retry executor.
//!
//! Runs a typed, zero-argument async closure under a [`RetryPolicy`]:
//!
//! ```text
//! for attempt in 1..=max_attempts:
//!     cancelled?            -> Cancelled
//!     run operation         (raced against cancellation)
//!     Ok(v)                 -> Success
//!     Err(kind = Cancelled) -> Cancelled (not recorded)
//!     Err(e)                -> record; fatal or last attempt -> Failure
//!     sleep(delay)          (raced against cancellation)
//! ```
//!
//! Synchronous operations are wrapped with `std::future::ready`.

use crate::observer::{RetryEvent, RetryObserver, TracingObserver};
use crate::outcome::{Cancelled, ErrorRecord, RetryOutcome};
use crate::policy::RetryPolicy;
use powerpos_core::{Classify, FailureKind};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Executes operations under a retry policy.
#[derive(Clone)]
pub struct RetryExecutor {
    /// Operation name used in events.
    name: String,
    policy: RetryPolicy,
    observer: Arc<dyn RetryObserver>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    /// Create an executor that logs through `tracing`.
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails fatally, runs out of
    /// attempts, or `cancel` fires.
    ///
    /// # Errors
    /// Returns [`Cancelled`] when cancellation is observed before an
    /// attempt, while an attempt is in flight, or during the inter-attempt
    /// delay. Operation failures are never returned as `Err`; they end up in
    /// [`RetryOutcome::Failure`].
    pub async fn execute<V, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<RetryOutcome<V>, Cancelled>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Classify + Display,
    {
        let max_attempts = self.policy.max_attempts();
        let mut errors: Vec<ErrorRecord> = Vec::new();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempt - 1));
            }

            self.emit(RetryEvent::AttemptStarted {
                operation: &self.name,
                attempt,
                max_attempts,
            });

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(attempt)),
                result = operation() => result,
            };

            let err = match result {
                Ok(value) => {
                    self.emit(RetryEvent::Succeeded {
                        operation: &self.name,
                        attempt,
                    });
                    return Ok(RetryOutcome::Success {
                        value,
                        retried: errors,
                    });
                }
                Err(err) => err,
            };

            let kind = err.kind();
            if kind == FailureKind::Cancelled || cancel.is_cancelled() {
                return Err(self.cancelled(attempt));
            }

            let record = ErrorRecord::new(attempt, kind, err.to_string());
            let retryable = self.policy.is_retryable(kind);
            self.emit(RetryEvent::AttemptFailed {
                operation: &self.name,
                record: &record,
                retryable,
            });
            errors.push(record);

            if !retryable || attempt >= max_attempts {
                self.emit(RetryEvent::Failed {
                    operation: &self.name,
                    errors: &errors,
                });
                return Ok(RetryOutcome::Failure { errors });
            }

            let delay = self.policy.delay();
            if !delay.is_zero() {
                self.emit(RetryEvent::Backoff {
                    operation: &self.name,
                    attempt,
                    delay,
                });

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(self.cancelled(attempt)),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        // max_attempts >= 1, so every path above returns from inside the loop
        Ok(RetryOutcome::Failure { errors })
    }

    fn emit(&self, event: RetryEvent<'_>) {
        self.observer.on_event(&event);
    }

    fn cancelled(&self, attempts_started: u32) -> Cancelled {
        self.emit(RetryEvent::Cancelled {
            operation: &self.name,
            attempts_started,
        });
        Cancelled { attempts_started }
    }
}

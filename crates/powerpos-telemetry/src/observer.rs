//! Retry observer that logs and records metrics.

use crate::metrics::Metrics;
use powerpos_retry::{RetryEvent, RetryObserver, TracingObserver};

/// Forwards retry events to `tracing` and Prometheus.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryObserver {
    log: TracingObserver,
}

impl TelemetryObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RetryObserver for TelemetryObserver {
    fn on_event(&self, event: &RetryEvent<'_>) {
        self.log.on_event(event);

        match *event {
            RetryEvent::AttemptStarted { operation, .. } => Metrics::retry_attempt(operation),
            RetryEvent::AttemptFailed {
                operation, record, ..
            } => Metrics::retry_failure(operation, record.kind.as_str()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{RETRY_ATTEMPTS_TOTAL, RETRY_FAILURES_TOTAL};
    use powerpos_core::FailureKind;
    use powerpos_retry::ErrorRecord;

    #[test]
    fn test_records_attempts_and_failures() {
        let observer = TelemetryObserver::new();
        let attempts = RETRY_ATTEMPTS_TOTAL.with_label_values(&["observer_op"]);
        let failures = RETRY_FAILURES_TOTAL.with_label_values(&["observer_op", "transient-sink"]);
        let attempts_before = attempts.get();
        let failures_before = failures.get();

        observer.on_event(&RetryEvent::AttemptStarted {
            operation: "observer_op",
            attempt: 1,
            max_attempts: 3,
        });
        let record = ErrorRecord {
            attempt: 1,
            kind: FailureKind::TransientSink,
            description: "disk full".to_string(),
        };
        observer.on_event(&RetryEvent::AttemptFailed {
            operation: "observer_op",
            record: &record,
            retryable: true,
        });
        observer.on_event(&RetryEvent::Succeeded {
            operation: "observer_op",
            attempt: 2,
        });

        assert_eq!(attempts.get() - attempts_before, 1.0);
        assert_eq!(failures.get() - failures_before, 1.0);
    }
}

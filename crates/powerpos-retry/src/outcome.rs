//! Results produced by one retry-executor invocation.

use powerpos_core::FailureKind;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One failed attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable error message.
    pub description: String,
}

impl ErrorRecord {
    pub fn new(attempt: u32, kind: FailureKind, description: impl Into<String>) -> Self {
        Self {
            attempt,
            kind,
            description: description.into(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempt {} [{}]: {}",
            self.attempt, self.kind, self.description
        )
    }
}

/// Final result of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<V> {
    /// The operation succeeded. `retried` holds the failures that preceded
    /// the successful attempt (empty on first-try success).
    Success { value: V, retried: Vec<ErrorRecord> },
    /// The operation failed for good. Never empty.
    Failure { errors: Vec<ErrorRecord> },
}

impl<V> RetryOutcome<V> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Every failure recorded during the run, in attempt order.
    #[must_use]
    pub fn errors(&self) -> &[ErrorRecord] {
        match self {
            Self::Success { retried, .. } => retried,
            Self::Failure { errors } => errors,
        }
    }

    /// Number of attempts the operation consumed.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { retried, .. } => retried.len() as u32 + 1,
            Self::Failure { errors } => errors.len() as u32,
        }
    }

    /// Drop the recovered-failure history and keep the value or the errors.
    pub fn into_result(self) -> Result<V, Vec<ErrorRecord>> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Failure { errors } => Err(errors),
        }
    }
}

/// The run was interrupted by cancellation.
///
/// Distinct from both success and failure; never recorded as an
/// [`ErrorRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled after {attempts_started} attempt(s) started")]
pub struct Cancelled {
    /// Attempts that had started when cancellation was observed.
    pub attempts_started: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let record = ErrorRecord::new(2, FailureKind::TransientSource, "service unavailable");
        assert_eq!(
            record.to_string(),
            "attempt 2 [transient-source]: service unavailable"
        );
    }

    #[test]
    fn test_record_serializes_kind_label() {
        let record = ErrorRecord::new(1, FailureKind::UnexpectedResult, "bad shape");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"attempt":1,"kind":"unexpected-result","description":"bad shape"}"#
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let ok: RetryOutcome<u8> = RetryOutcome::Success {
            value: 7,
            retried: vec![ErrorRecord::new(1, FailureKind::TransientSink, "x")],
        };
        assert!(ok.is_success());
        assert_eq!(ok.attempts(), 2);
        assert_eq!(ok.errors().len(), 1);
        assert_eq!(ok.into_result(), Ok(7));

        let failed: RetryOutcome<u8> = RetryOutcome::Failure {
            errors: vec![
                ErrorRecord::new(1, FailureKind::TransientSink, "x"),
                ErrorRecord::new(2, FailureKind::Fatal, "y"),
            ],
        };
        assert!(!failed.is_success());
        assert_eq!(failed.attempts(), 2);
        assert_eq!(failed.into_result().unwrap_err().len(), 2);
    }
}

//! Failure taxonomy shared by every fallible operation in the pipeline.
//!
//! Retry policies are declared in terms of [`FailureKind`]s rather than
//! concrete error types, so one executor can wrap fetch, aggregate and
//! persist operations alike.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a failure, as seen by a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Index outside an accumulator's bounds. Programming error, never retried.
    BoundsViolation,
    /// Transient failure reported by the upstream trade source.
    TransientSource,
    /// Transient I/O failure while persisting output.
    TransientSink,
    /// Operation produced a result of the wrong shape.
    UnexpectedResult,
    /// Any other non-retryable failure.
    Fatal,
    /// Cooperative cancellation. Not an error; never recorded as one.
    Cancelled,
}

impl FailureKind {
    /// Stable string label used in logs, metrics and error records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BoundsViolation => "bounds-violation",
            Self::TransientSource => "transient-source",
            Self::TransientSink => "transient-sink",
            Self::UnexpectedResult => "unexpected-result",
            Self::Fatal => "fatal",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an error onto the shared failure taxonomy.
pub trait Classify {
    /// Failure category of this error.
    fn kind(&self) -> FailureKind;
}

//! Cancellable retry executor.
//!
//! Wraps any fallible async operation in a uniform protocol:
//! - Up to `max_attempts` invocations with a fixed delay between them
//! - Failures classified through [`powerpos_core::Classify`]; only kinds the
//!   policy declares retryable earn another attempt
//! - Every failure recorded as an [`ErrorRecord`], in attempt order
//! - Cancellation checked at every attempt boundary and during every wait,
//!   surfaced as [`Cancelled`] rather than as another error
//! - Structured [`RetryEvent`]s delivered to an injected [`RetryObserver`]

pub mod error;
pub mod executor;
pub mod observer;
pub mod outcome;
pub mod policy;

pub use error::{RetryError, RetryResult};
pub use executor::RetryExecutor;
pub use observer::{NoopObserver, RetryEvent, RetryObserver, TracingObserver};
pub use outcome::{Cancelled, ErrorRecord, RetryOutcome};
pub use policy::RetryPolicy;

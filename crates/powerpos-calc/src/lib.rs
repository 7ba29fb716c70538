//! Power position calculation.
//!
//! Fetches the trades for a target time and folds their hourly volumes into
//! a fresh [`powerpos_core::BucketedAccumulator`] using a bounded pool of
//! parallel workers.

pub mod calculator;
pub mod cycle;
pub mod error;

pub use calculator::PositionCalculator;
pub use cycle::{AggregationConfig, AggregationCycle};
pub use error::{CalcError, CalcResult};

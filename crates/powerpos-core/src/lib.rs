//! Core domain types for power position aggregation.
//!
//! This crate provides the pieces every other crate builds on:
//! - `BucketedAccumulator`: fixed-size array of independently locked slots
//! - `FailureKind` / `Classify`: the shared failure taxonomy used by retry policies
//! - `TradeRecord`, `TradePeriod`: per-trade hourly volume contributions
//! - `Clock`: wall clock pinned to a reference timezone

pub mod accumulator;
pub mod clock;
pub mod error;
pub mod failure;
pub mod trade;

pub use accumulator::{BucketedAccumulator, Iter};
pub use clock::{parse_local, Clock, FixedClock, ReferenceClock, DEFAULT_TIMEZONE};
pub use error::{CoreError, Result};
pub use failure::{Classify, FailureKind};
pub use trade::{TradePeriod, TradeRecord, PERIODS_PER_DAY};

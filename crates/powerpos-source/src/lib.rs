//! Trade source interface.
//!
//! - `TradeSource`: dyn-compatible async trait consumed by the calculator
//! - `SimulatedPowerService`: stand-in for the vendor trading service with
//!   random latency, random transient outages and random trades
//! - `ScriptedTradeSource`: deterministic source for tests and replays

pub mod error;
pub mod scripted;
pub mod simulated;
pub mod source;

pub use error::{SourceError, SourceResult};
pub use scripted::ScriptedTradeSource;
pub use simulated::{SimulatedPowerService, SimulatedSourceConfig};
pub use source::{BoxFuture, TradeSource};

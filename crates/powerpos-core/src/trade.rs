//! Trade records as delivered by the trade source.

use serde::{Deserialize, Serialize};

/// Number of hourly periods in a power day.
pub const PERIODS_PER_DAY: usize = 24;

/// Volume traded for one hourly period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePeriod {
    /// 1-based period number (1 = 23:00 of the previous day).
    pub period: i32,
    /// Volume for the period. May be negative (sell).
    pub volume: f64,
}

/// A single trade with its per-period volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Identifier assigned by the source.
    pub trade_id: String,
    /// Per-period volumes, not necessarily ordered or complete.
    pub periods: Vec<TradePeriod>,
}

impl TradeRecord {
    /// Create a trade record.
    pub fn new(trade_id: impl Into<String>, periods: Vec<TradePeriod>) -> Self {
        Self {
            trade_id: trade_id.into(),
            periods,
        }
    }

    /// `(bucket index, amount)` contributions of this trade.
    ///
    /// Bucket indices are 0-based and signed; a malformed period number
    /// yields an index the accumulator will reject.
    pub fn contributions(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.periods
            .iter()
            .map(|p| (i64::from(p.period) - 1, p.volume))
    }

    /// Sum of all volumes in this trade.
    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.periods.iter().map(|p| p.volume).sum()
    }
}

//! Fetch + aggregate, the unit the scheduler retries.

use crate::cycle::AggregationCycle;
use crate::error::{CalcError, CalcResult};
use chrono::DateTime;
use chrono_tz::Tz;
use powerpos_source::TradeSource;
use powerpos_telemetry::Metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Computes the hourly position for a target time.
pub struct PositionCalculator {
    source: Arc<dyn TradeSource>,
    cycle: AggregationCycle,
}

impl PositionCalculator {
    pub fn new(source: Arc<dyn TradeSource>, cycle: AggregationCycle) -> Self {
        Self { source, cycle }
    }

    #[must_use]
    pub fn cycle(&self) -> &AggregationCycle {
        &self.cycle
    }

    /// Fetch the trades for `target` and fold them into one position.
    ///
    /// A fresh accumulator is used on every call.
    pub async fn calculate(
        &self,
        target: DateTime<Tz>,
        cancel: &CancellationToken,
    ) -> CalcResult<Vec<f64>> {
        if cancel.is_cancelled() {
            return Err(CalcError::Cancelled);
        }
        let started = Instant::now();

        let trades = self.source.fetch(target, cancel).await?;
        debug!(target = %target, trades = trades.len(), "Trades fetched");

        let position = self.cycle.run(trades, cancel).await?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let total: f64 = position.iter().sum();
        Metrics::cycle_duration(elapsed_ms);
        Metrics::last_position_total(total);
        info!(target = %target, total, elapsed_ms, "Position calculated");

        Ok(position)
    }
}

impl std::fmt::Debug for PositionCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionCalculator")
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

//! Parallel fold of trade records into a fresh accumulator.
//!
//! One worker per record, at most `worker_pool_size` running at a time. Each
//! worker calls [`BucketedAccumulator::add`] for every contribution of its
//! record. The first out-of-range period aborts the whole cycle.

use crate::error::{CalcError, CalcResult};
use powerpos_core::{BucketedAccumulator, CoreError, TradeRecord, PERIODS_PER_DAY};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Aggregation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Number of buckets (hourly periods).
    #[serde(default = "default_periods")]
    pub periods: usize,
    /// Maximum number of records folded concurrently.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

fn default_periods() -> usize {
    PERIODS_PER_DAY
}

fn default_worker_pool_size() -> usize {
    10
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            periods: default_periods(),
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

/// Bounded worker pool folding records into per-period sums.
#[derive(Debug, Clone)]
pub struct AggregationCycle {
    periods: usize,
    worker_pool_size: usize,
}

impl AggregationCycle {
    /// Create a cycle; both sizes must be non-zero.
    pub fn new(config: &AggregationConfig) -> CalcResult<Self> {
        if config.periods == 0 {
            return Err(CalcError::InvalidConfig("periods must be > 0".to_string()));
        }
        if config.worker_pool_size == 0 {
            return Err(CalcError::InvalidConfig(
                "worker_pool_size must be > 0".to_string(),
            ));
        }
        Ok(Self {
            periods: config.periods,
            worker_pool_size: config.worker_pool_size,
        })
    }

    #[must_use]
    pub fn periods(&self) -> usize {
        self.periods
    }

    #[must_use]
    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size
    }

    /// Fold `records` into a fresh accumulator and return its snapshot.
    ///
    /// Must be called on a tokio runtime; workers are spawned tasks.
    ///
    /// # Errors
    /// - [`CalcError::Accumulator`] (bounds violation) for a period outside
    ///   `1..=periods`; remaining workers are aborted
    /// - [`CalcError::WorkerFailed`] when a worker panics
    /// - [`CalcError::Cancelled`] when `cancel` fires before completion
    pub async fn run(
        &self,
        records: Vec<TradeRecord>,
        cancel: &CancellationToken,
    ) -> CalcResult<Vec<f64>> {
        if cancel.is_cancelled() {
            return Err(CalcError::Cancelled);
        }

        let accumulator = Arc::new(BucketedAccumulator::<f64>::new(self.periods)?);
        let permits = Arc::new(Semaphore::new(self.worker_pool_size));
        let record_count = records.len();
        // Dropping the set aborts every worker still running
        let mut workers = JoinSet::new();

        for record in records {
            if cancel.is_cancelled() {
                return Err(CalcError::Cancelled);
            }

            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CalcError::Cancelled),
                permit = Arc::clone(&permits).acquire_owned() => permit
                    .map_err(|e| CalcError::WorkerFailed(format!("worker pool closed: {e}")))?,
            };

            let accumulator = Arc::clone(&accumulator);
            let worker_cancel = cancel.clone();
            workers.spawn(async move {
                let _permit = permit;
                fold_record(&accumulator, &record, &worker_cancel)
            });

            if cancel.is_cancelled() {
                return Err(CalcError::Cancelled);
            }

            // Fail fast on workers that already finished
            while let Some(joined) = workers.try_join_next() {
                settle(joined)?;
            }
        }

        loop {
            let joined = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CalcError::Cancelled),
                joined = workers.join_next() => joined,
            };
            match joined {
                Some(joined) => settle(joined)?,
                None => break,
            }
        }

        debug!(
            records = record_count,
            periods = self.periods,
            "Aggregation cycle complete"
        );
        Ok(accumulator.snapshot())
    }
}

/// Fold one record's contributions, checking cancellation before each.
fn fold_record(
    accumulator: &BucketedAccumulator<f64>,
    record: &TradeRecord,
    cancel: &CancellationToken,
) -> CalcResult<()> {
    for (index, amount) in record.contributions() {
        if cancel.is_cancelled() {
            return Err(CalcError::Cancelled);
        }
        let slot = usize::try_from(index).map_err(|_| CoreError::IndexOutOfRange {
            index,
            len: accumulator.len(),
        })?;
        if let Err(e) = accumulator.add(slot, amount) {
            warn!(trade_id = %record.trade_id, index, "Contribution outside the power day");
            return Err(e.into());
        }
    }
    trace!(trade_id = %record.trade_id, total = record.total_volume(), "Record folded");
    Ok(())
}

fn settle(joined: Result<CalcResult<()>, JoinError>) -> CalcResult<()> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(CalcError::WorkerFailed(format!("worker panicked: {e}"))),
        Err(e) => Err(CalcError::WorkerFailed(e.to_string())),
    }
}

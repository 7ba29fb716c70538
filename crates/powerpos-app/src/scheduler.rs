//! Fixed-interval position scheduler.
//!
//! Each tick advances the target time by one interval and spawns an
//! independent tick task, then sleeps until one interval after the tick
//! started. Ticks may overlap; every tick owns its own accumulator.
//!
//! A tick runs two retried steps:
//! 1. fetch + aggregate, retrying transient source failures
//! 2. only on success, the CSV write, retrying I/O failures
//!
//! A tick that gives up logs its full error history and the loop carries
//! on. Only cancellation stops the loop; in-flight ticks see the same token,
//! report [`TickOutcome::Cancelled`] and are drained before returning.

use crate::error::{AppError, AppResult};
use chrono::DateTime;
use chrono_tz::Tz;
use powerpos_calc::PositionCalculator;
use powerpos_core::Clock;
use powerpos_persistence::PositionSink;
use powerpos_retry::{ErrorRecord, RetryExecutor, RetryOutcome};
use powerpos_telemetry::Metrics;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Target time bookkeeping, mutated once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    target_time: DateTime<Tz>,
    interval: chrono::Duration,
}

impl ScheduleState {
    pub fn new(start_time: DateTime<Tz>, interval: chrono::Duration) -> Self {
        Self {
            target_time: start_time,
            interval,
        }
    }

    #[must_use]
    pub fn target_time(&self) -> DateTime<Tz> {
        self.target_time
    }

    #[must_use]
    pub fn interval(&self) -> chrono::Duration {
        self.interval
    }

    /// Move the target one interval forward and return it.
    pub fn advance(&mut self) -> DateTime<Tz> {
        self.target_time += self.interval;
        self.target_time
    }
}

/// How a tick ended.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Position calculated and written.
    Persisted { path: PathBuf },
    /// Calculation gave up; nothing was written.
    AggregationFailed { errors: Vec<ErrorRecord> },
    /// Calculation succeeded but the write gave up.
    PersistFailed { errors: Vec<ErrorRecord> },
    /// Stopped by cancellation.
    Cancelled,
}

impl TickOutcome {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Persisted { .. } => "persisted",
            Self::AggregationFailed { .. } => "aggregation_failed",
            Self::PersistFailed { .. } => "persist_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick_id: Uuid,
    pub target_time: DateTime<Tz>,
    pub outcome: TickOutcome,
}

/// Periodic driver of position calculation and persistence.
pub struct Scheduler {
    calculator: Arc<PositionCalculator>,
    sink: Arc<dyn PositionSink>,
    clock: Arc<dyn Clock>,
    calculation_retry: RetryExecutor,
    persistence_retry: RetryExecutor,
    csv_dir: PathBuf,
    reports: Option<mpsc::UnboundedSender<TickReport>>,
}

impl Scheduler {
    pub fn new(
        calculator: Arc<PositionCalculator>,
        sink: Arc<dyn PositionSink>,
        clock: Arc<dyn Clock>,
        calculation_retry: RetryExecutor,
        persistence_retry: RetryExecutor,
        csv_dir: PathBuf,
    ) -> Self {
        Self {
            calculator,
            sink,
            clock,
            calculation_retry,
            persistence_retry,
            csv_dir,
            reports: None,
        }
    }

    /// Publish every finished tick on `tx`.
    #[must_use]
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<TickReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Run every `interval_minutes` until `cancel` fires.
    ///
    /// The first tick targets `start_time + interval`.
    pub async fn run_forever(
        self: Arc<Self>,
        interval_minutes: u64,
        start_time: DateTime<Tz>,
        cancel: CancellationToken,
    ) -> AppResult<ScheduleState> {
        if interval_minutes == 0 {
            return Err(AppError::Config("interval must be > 0 minutes".to_string()));
        }
        let interval = Duration::from_secs(interval_minutes.saturating_mul(60));
        self.run_every(interval, start_time, cancel).await
    }

    /// Same as [`Scheduler::run_forever`] with an arbitrary interval.
    pub async fn run_every(
        self: Arc<Self>,
        interval: Duration,
        start_time: DateTime<Tz>,
        cancel: CancellationToken,
    ) -> AppResult<ScheduleState> {
        if interval.is_zero() {
            return Err(AppError::Config("interval must be > 0".to_string()));
        }
        let step = chrono::Duration::from_std(interval)
            .map_err(|e| AppError::Config(format!("interval out of range: {e}")))?;
        let mut state = ScheduleState::new(start_time, step);
        let mut ticks = JoinSet::new();

        info!(
            interval_ms = interval.as_millis() as u64,
            start_time = %start_time,
            csv_dir = %self.csv_dir.display(),
            "Scheduler started"
        );

        'ticks: while !cancel.is_cancelled() {
            let tick_started = Instant::now();
            let target = state.advance();
            let tick_id = Uuid::new_v4();

            let scheduler = Arc::clone(&self);
            let token = cancel.clone();
            ticks.spawn(async move { scheduler.run_tick(tick_id, target, &token).await });

            // Publish ticks as they finish while waiting for the next one
            let deadline = tick_started + interval;
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break 'ticks,
                    Some(joined) = ticks.join_next(), if !ticks.is_empty() => self.publish(joined),
                    () = tokio::time::sleep_until(deadline) => break,
                }
            }
        }

        info!(in_flight = ticks.len(), "Cancellation requested, draining ticks");
        while let Some(joined) = ticks.join_next().await {
            self.publish(joined);
        }
        info!(last_target = %state.target_time(), "Scheduler stopped");

        Ok(state)
    }

    /// Run one tick: calculate under retry, then persist under retry.
    pub async fn run_tick(
        &self,
        tick_id: Uuid,
        target: DateTime<Tz>,
        cancel: &CancellationToken,
    ) -> TickReport {
        let now = self.clock.now();
        info!(%tick_id, now = %now, target = %target, "Starting position calculation");

        let outcome = self.calculate_and_persist(target, now, cancel).await;
        match &outcome {
            TickOutcome::Persisted { path } => {
                info!(%tick_id, path = %path.display(), "Position report written");
            }
            TickOutcome::AggregationFailed { errors } => {
                error!(
                    %tick_id,
                    errors = ?errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "Position calculation failed"
                );
            }
            TickOutcome::PersistFailed { errors } => {
                error!(
                    %tick_id,
                    errors = ?errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "Position report could not be written"
                );
            }
            TickOutcome::Cancelled => debug!(%tick_id, "Tick cancelled"),
        }

        TickReport {
            tick_id,
            target_time: target,
            outcome,
        }
    }

    async fn calculate_and_persist(
        &self,
        target: DateTime<Tz>,
        now: DateTime<Tz>,
        cancel: &CancellationToken,
    ) -> TickOutcome {
        let calculated = self
            .calculation_retry
            .execute(cancel, || self.calculator.calculate(target, cancel))
            .await;
        let position = match calculated {
            Err(_) => return TickOutcome::Cancelled,
            Ok(RetryOutcome::Failure { errors }) => {
                return TickOutcome::AggregationFailed { errors }
            }
            Ok(RetryOutcome::Success { value, .. }) => value,
        };

        // The report is stamped with the tick's wall time, not the target
        let persisted = self
            .persistence_retry
            .execute(cancel, || {
                self.sink.persist(&position, &self.csv_dir, now, cancel)
            })
            .await;
        match persisted {
            Err(_) => TickOutcome::Cancelled,
            Ok(RetryOutcome::Failure { errors }) => TickOutcome::PersistFailed { errors },
            Ok(RetryOutcome::Success { value, .. }) => TickOutcome::Persisted { path: value },
        }
    }

    fn publish(&self, joined: Result<TickReport, JoinError>) {
        match joined {
            Ok(report) => {
                Metrics::tick(report.outcome.label());
                if let Some(tx) = &self.reports {
                    // Receiver may be gone during shutdown
                    let _ = tx.send(report);
                }
            }
            Err(e) => warn!(error = %e, "Tick task did not complete"),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("calculation_retry", &self.calculation_retry)
            .field("persistence_retry", &self.persistence_retry)
            .field("csv_dir", &self.csv_dir)
            .finish_non_exhaustive()
    }
}

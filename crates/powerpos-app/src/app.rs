//! Application wiring.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::scheduler::{ScheduleState, Scheduler, TickReport};
use chrono::DateTime;
use chrono_tz::Tz;
use powerpos_calc::{AggregationCycle, PositionCalculator};
use powerpos_core::Clock;
use powerpos_persistence::CsvPositionWriter;
use powerpos_retry::RetryExecutor;
use powerpos_source::SimulatedPowerService;
use powerpos_telemetry::TelemetryObserver;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main application.
pub struct Application {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    scheduler: Arc<Scheduler>,
}

impl Application {
    /// Build every component from a validated configuration.
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        Self::build(config, clock, None)
    }

    /// Same as [`Application::new`], publishing tick reports on `reports`.
    pub fn with_reports(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        reports: mpsc::UnboundedSender<TickReport>,
    ) -> AppResult<Self> {
        Self::build(config, clock, Some(reports))
    }

    fn build(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        reports: Option<mpsc::UnboundedSender<TickReport>>,
    ) -> AppResult<Self> {
        config.validate()?;

        let mut source_config = config.source.clone();
        source_config.periods = config.aggregation.periods;
        let source = Arc::new(SimulatedPowerService::new(source_config)?);

        let cycle = AggregationCycle::new(&config.aggregation)?;
        let calculator = Arc::new(PositionCalculator::new(source, cycle));
        let sink = Arc::new(CsvPositionWriter::new(config.aggregation.periods));

        let observer = Arc::new(TelemetryObserver::new());
        let calculation_retry =
            RetryExecutor::new("calculate_position", config.calculation_policy()?)
                .with_observer(observer.clone());
        let persistence_retry =
            RetryExecutor::new("write_position_csv", config.persistence_policy()?)
                .with_observer(observer);

        let mut scheduler = Scheduler::new(
            calculator,
            sink,
            Arc::clone(&clock),
            calculation_retry,
            persistence_retry,
            config.output.csv_dir.clone(),
        );
        if let Some(tx) = reports {
            scheduler = scheduler.with_reports(tx);
        }

        Ok(Self {
            config,
            clock,
            scheduler: Arc::new(scheduler),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// First target time: the configured start, or now.
    pub fn start_time(&self) -> AppResult<DateTime<Tz>> {
        let tz = self.clock.timezone();
        Ok(self
            .config
            .start_time(tz)?
            .unwrap_or_else(|| self.clock.now()))
    }

    /// Run the scheduler until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> AppResult<ScheduleState> {
        let start_time = self.start_time()?;
        info!(
            interval_minutes = self.config.schedule.interval_minutes,
            csv_dir = %self.config.output.csv_dir.display(),
            "The position report will run every {} minutes",
            self.config.schedule.interval_minutes
        );

        Arc::clone(&self.scheduler)
            .run_forever(self.config.schedule.interval_minutes, start_time, cancel)
            .await
    }
}

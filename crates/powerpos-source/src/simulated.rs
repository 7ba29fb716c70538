//! Simulated power trading service.
//!
//! Behaves like the vendor service the calculator was written against:
//! each call takes a random amount of time, occasionally fails with a
//! transient outage, and otherwise returns a random number of trades, each
//! carrying one volume per hourly period.

use crate::error::{SourceError, SourceResult};
use crate::source::{BoxFuture, TradeSource};
use chrono::DateTime;
use chrono_tz::Tz;
use parking_lot::Mutex;
use powerpos_core::{TradePeriod, TradeRecord, PERIODS_PER_DAY};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Simulated service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSourceConfig {
    /// Probability (0.0-1.0) that a call fails with a transient outage. Default: 0.1.
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
    /// Upper bound on trades returned per call. Default: 10.
    #[serde(default = "default_max_trades")]
    pub max_trades: usize,
    /// Upper bound on simulated call latency (ms). Default: 200.
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// Periods per trade. Default: 24.
    #[serde(default = "default_periods")]
    pub periods: usize,
    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_failure_rate() -> f64 {
    0.1
}

fn default_max_trades() -> usize {
    10
}

fn default_max_latency_ms() -> u64 {
    200
}

fn default_periods() -> usize {
    PERIODS_PER_DAY
}

impl Default for SimulatedSourceConfig {
    fn default() -> Self {
        Self {
            failure_rate: default_failure_rate(),
            max_trades: default_max_trades(),
            max_latency_ms: default_max_latency_ms(),
            periods: default_periods(),
            seed: None,
        }
    }
}

/// What a single call is going to do, drawn up front so the RNG lock is
/// never held across an await point.
struct CallPlan {
    latency: Duration,
    outage: bool,
    trades: Vec<TradeRecord>,
}

/// Random trade generator standing in for the real trading service.
pub struct SimulatedPowerService {
    config: SimulatedSourceConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedPowerService {
    /// Create a simulated service.
    pub fn new(config: SimulatedSourceConfig) -> SourceResult<Self> {
        if !(0.0..=1.0).contains(&config.failure_rate) {
            return Err(SourceError::InvalidConfig(format!(
                "failure_rate must be within 0.0..=1.0, got {}",
                config.failure_rate
            )));
        }
        if config.max_trades == 0 || config.periods == 0 {
            return Err(SourceError::InvalidConfig(
                "max_trades and periods must be greater than zero".to_string(),
            ));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            rng: Mutex::new(rng),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SimulatedSourceConfig {
        &self.config
    }

    fn plan_call(&self) -> CallPlan {
        let mut rng = self.rng.lock();

        let latency = Duration::from_millis(rng.gen_range(0..=self.config.max_latency_ms));
        let outage = rng.gen_bool(self.config.failure_rate);

        let trade_count = rng.gen_range(1..=self.config.max_trades);
        let trades = (0..trade_count)
            .map(|_| {
                let trade_id = Uuid::from_u128(rng.gen()).to_string();
                let periods = (1..=self.config.periods)
                    .map(|period| TradePeriod {
                        period: i32::try_from(period).unwrap_or(i32::MAX),
                        volume: (rng.gen_range(-100.0..100.0_f64) * 100.0).round() / 100.0,
                    })
                    .collect();
                TradeRecord::new(trade_id, periods)
            })
            .collect();

        CallPlan {
            latency,
            outage,
            trades,
        }
    }
}

impl TradeSource for SimulatedPowerService {
    fn fetch<'a>(
        &'a self,
        target: DateTime<Tz>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<Vec<TradeRecord>>> {
        Box::pin(async move {
            let plan = self.plan_call();
            debug!(
                %target,
                latency_ms = plan.latency.as_millis() as u64,
                "Querying simulated power service"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SourceError::Cancelled),
                () = tokio::time::sleep(plan.latency) => {}
            }

            if plan.outage {
                warn!(%target, "Simulated power service outage");
                return Err(SourceError::Transient(format!(
                    "power service did not answer for {}",
                    target.date_naive()
                )));
            }

            info!(%target, trades = plan.trades.len(), "Fetched trades");
            Ok(plan.trades)
        })
    }
}

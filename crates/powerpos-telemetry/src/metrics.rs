//! Prometheus metrics for the power position service.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};

/// Scheduler ticks by outcome.
/// Labels: outcome (persisted/aggregation_failed/persist_failed/cancelled)
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "powerpos_ticks_total",
        "Total scheduler ticks by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Attempts started by retried operations.
pub static RETRY_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "powerpos_retry_attempts_total",
        "Total attempts started by retried operations",
        &["operation"]
    )
    .unwrap()
});

/// Failed attempts by failure kind.
pub static RETRY_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "powerpos_retry_failures_total",
        "Total failed attempts by operation and failure kind",
        &["operation", "kind"]
    )
    .unwrap()
});

/// Wall time of one fetch + aggregate cycle in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "powerpos_cycle_duration_ms",
        "Duration of one position calculation in milliseconds",
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// Sum of all periods of the most recently calculated position.
pub static LAST_POSITION_TOTAL: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "powerpos_last_position_total",
        "Total volume across all periods of the last calculated position"
    )
    .unwrap()
});

/// Metrics helper for recording values.
pub struct Metrics;

impl Metrics {
    /// Record a finished tick.
    pub fn tick(outcome: &str) {
        TICKS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record an attempt start.
    pub fn retry_attempt(operation: &str) {
        RETRY_ATTEMPTS_TOTAL.with_label_values(&[operation]).inc();
    }

    /// Record a failed attempt.
    pub fn retry_failure(operation: &str, kind: &str) {
        RETRY_FAILURES_TOTAL
            .with_label_values(&[operation, kind])
            .inc();
    }

    /// Record calculation duration.
    pub fn cycle_duration(duration_ms: f64) {
        CYCLE_DURATION_MS.observe(duration_ms);
    }

    /// Record the total of the last calculated position.
    pub fn last_position_total(total: f64) {
        LAST_POSITION_TOTAL.set(total);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

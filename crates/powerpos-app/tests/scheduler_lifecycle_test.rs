//! Scheduler lifecycle integration tests.
//!
//! Tests the scheduling loop end to end with in-memory collaborators:
//! - Target time advancing once per tick
//! - Failed ticks not stopping the loop
//! - Prompt shutdown with in-flight ticks drained

use chrono::{DateTime, TimeZone};
use chrono_tz::Europe::London;
use chrono_tz::Tz;
use parking_lot::Mutex;
use powerpos_app::{Scheduler, TickOutcome, TickReport};
use powerpos_calc::{AggregationConfig, AggregationCycle, PositionCalculator};
use powerpos_core::{FailureKind, ReferenceClock, TradePeriod, TradeRecord};
use powerpos_persistence::{BoxFuture, PersistenceError, PersistenceResult, PositionSink};
use powerpos_retry::{NoopObserver, RetryExecutor, RetryPolicy};
use powerpos_source::{SourceError, SourceResult, TradeSource};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// How the stub source answers.
#[derive(Clone, Copy)]
enum SourceMode {
    Trades,
    AlwaysDown,
    Hang,
    Slow(Duration),
}

struct StubSource {
    mode: SourceMode,
    targets: Mutex<Vec<DateTime<Tz>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubSource {
    fn new(mode: SourceMode) -> Self {
        Self {
            mode,
            targets: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn answer(&self) -> Vec<TradeRecord> {
        vec![TradeRecord::new(
            "stub",
            (1..=24)
                .map(|period| TradePeriod {
                    period,
                    volume: 1.0,
                })
                .collect(),
        )]
    }
}

impl TradeSource for StubSource {
    fn fetch<'a>(
        &'a self,
        target: DateTime<Tz>,
        cancel: &'a CancellationToken,
    ) -> powerpos_source::BoxFuture<'a, SourceResult<Vec<TradeRecord>>> {
        Box::pin(async move {
            self.targets.lock().push(target);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            let result = match self.mode {
                SourceMode::Trades => Ok(self.answer()),
                SourceMode::AlwaysDown => Err(SourceError::Transient("service down".to_string())),
                SourceMode::Hang => {
                    cancel.cancelled().await;
                    Err(SourceError::Cancelled)
                }
                SourceMode::Slow(latency) => tokio::select! {
                    () = cancel.cancelled() => Err(SourceError::Cancelled),
                    () = tokio::time::sleep(latency) => Ok(self.answer()),
                },
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

#[derive(Default)]
struct MemorySink {
    written: Mutex<Vec<Vec<f64>>>,
}

impl PositionSink for MemorySink {
    fn persist<'a>(
        &'a self,
        position: &'a [f64],
        dir: &'a Path,
        timestamp: DateTime<Tz>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, PersistenceResult<PathBuf>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(PersistenceError::Cancelled);
            }
            self.written.lock().push(position.to_vec());
            Ok(dir.join(timestamp.format("%H%M%S%f").to_string()))
        })
    }
}

fn executor(name: &str, kind: FailureKind) -> RetryExecutor {
    RetryExecutor::new(name, RetryPolicy::new(2, Duration::ZERO, [kind]).unwrap())
        .with_observer(Arc::new(NoopObserver))
}

fn scheduler(
    source: Arc<StubSource>,
    sink: Arc<MemorySink>,
) -> (Arc<Scheduler>, mpsc::UnboundedReceiver<TickReport>) {
    let cycle = AggregationCycle::new(&AggregationConfig::default()).unwrap();
    let calculator = Arc::new(PositionCalculator::new(source, cycle));
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new(
        calculator,
        sink,
        Arc::new(ReferenceClock::london()),
        executor("calculate", FailureKind::TransientSource),
        executor("persist", FailureKind::TransientSink),
        PathBuf::from("memory"),
    )
    .with_reports(tx);
    (Arc::new(scheduler), rx)
}

fn start() -> DateTime<Tz> {
    London.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// Each tick targets one more interval past the start time.
#[tokio::test]
async fn test_ticks_advance_target_time() {
    let source = Arc::new(StubSource::new(SourceMode::Trades));
    let sink = Arc::new(MemorySink::default());
    let (scheduler, mut rx) = scheduler(Arc::clone(&source), Arc::clone(&sink));
    let interval = Duration::from_millis(40);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(scheduler.run_every(interval, start(), cancel.clone()));

    let mut reports = Vec::new();
    while reports.len() < 3 {
        let report = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("tick within timeout")
            .expect("channel open");
        reports.push(report);
    }
    cancel.cancel();
    let state = timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler stops promptly")
        .unwrap()
        .unwrap();

    let step = chrono::Duration::milliseconds(40);
    for (i, report) in reports.iter().enumerate() {
        assert!(
            matches!(report.outcome, TickOutcome::Persisted { .. }),
            "tick {i}: {:?}",
            report.outcome
        );
        assert_eq!(report.target_time, start() + step * (i as i32 + 1));
    }

    assert!(source.targets.lock().len() >= 3);
    assert!(state.target_time() >= reports[2].target_time);
    assert!(sink
        .written
        .lock()
        .iter()
        .all(|position| position == &vec![1.0; 24]));
}

/// A tick that exhausts its retries does not stop the loop.
#[tokio::test]
async fn test_failed_ticks_keep_loop_running() {
    let source = Arc::new(StubSource::new(SourceMode::AlwaysDown));
    let sink = Arc::new(MemorySink::default());
    let (scheduler, mut rx) = scheduler(Arc::clone(&source), Arc::clone(&sink));
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(scheduler.run_every(
        Duration::from_millis(30),
        start(),
        cancel.clone(),
    ));

    for _ in 0..2 {
        let report = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("tick within timeout")
            .expect("channel open");
        match report.outcome {
            TickOutcome::AggregationFailed { errors } => {
                assert_eq!(errors.len(), 2);
                assert!(errors
                    .iter()
                    .all(|e| e.kind == FailureKind::TransientSource));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    cancel.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler stops promptly")
        .unwrap()
        .unwrap();
    assert!(sink.written.lock().is_empty());
}

/// Cancellation stops the loop and drains the in-flight tick as cancelled.
#[tokio::test]
async fn test_cancellation_drains_in_flight_tick() {
    let source = Arc::new(StubSource::new(SourceMode::Hang));
    let sink = Arc::new(MemorySink::default());
    let (scheduler, mut rx) = scheduler(Arc::clone(&source), Arc::clone(&sink));
    let cancel = CancellationToken::new();

    // Long interval: only the first tick ever starts
    let handle = tokio::spawn(scheduler.run_forever(60, start(), cancel.clone()));

    timeout(Duration::from_secs(2), async {
        while source.targets.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first tick starts");

    cancel.cancel();
    let state = timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler stops promptly")
        .unwrap()
        .unwrap();

    let report = rx.recv().await.expect("drained tick is reported");
    assert!(matches!(report.outcome, TickOutcome::Cancelled));
    assert_eq!(report.target_time, start() + chrono::Duration::minutes(60));
    assert_eq!(state.target_time(), report.target_time);
    assert!(sink.written.lock().is_empty());
}

/// A tick slower than the interval overlaps the next one; both complete.
#[tokio::test]
async fn test_slow_ticks_overlap() {
    let source = Arc::new(StubSource::new(SourceMode::Slow(Duration::from_millis(150))));
    let sink = Arc::new(MemorySink::default());
    let (scheduler, mut rx) = scheduler(Arc::clone(&source), Arc::clone(&sink));
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(scheduler.run_every(
        Duration::from_millis(50),
        start(),
        cancel.clone(),
    ));

    let mut reports = Vec::new();
    while reports.len() < 2 {
        let report = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("tick within timeout")
            .expect("channel open");
        reports.push(report);
    }
    cancel.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler stops promptly")
        .unwrap()
        .unwrap();

    // The second tick started while the first was still fetching
    assert!(source.max_in_flight.load(Ordering::SeqCst) >= 2);

    reports.sort_by_key(|report| report.target_time);
    let step = chrono::Duration::milliseconds(50);
    for (i, report) in reports.iter().enumerate() {
        assert!(
            matches!(report.outcome, TickOutcome::Persisted { .. }),
            "tick {i}: {:?}",
            report.outcome
        );
        assert_eq!(report.target_time, start() + step * (i as i32 + 1));
    }
    assert_ne!(reports[0].tick_id, reports[1].tick_id);
}

/// Reports are published as soon as a tick finishes, not at the next tick.
#[tokio::test]
async fn test_report_published_before_next_tick() {
    let source = Arc::new(StubSource::new(SourceMode::Trades));
    let sink = Arc::new(MemorySink::default());
    let (scheduler, mut rx) = scheduler(Arc::clone(&source), Arc::clone(&sink));
    let cancel = CancellationToken::new();

    // Only the first tick can run within the test's lifetime
    let handle = tokio::spawn(scheduler.run_forever(60, start(), cancel.clone()));

    let report = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("first tick reported during the interval")
        .expect("channel open");
    assert!(matches!(report.outcome, TickOutcome::Persisted { .. }));
    assert_eq!(source.targets.lock().len(), 1);

    cancel.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler stops promptly")
        .unwrap()
        .unwrap();
}

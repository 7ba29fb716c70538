//! CSV position writer.
//!
//! Layout:
//! ```text
//! LocalTime,Volume
//! 23:00,150
//! 00:00,150
//! ...
//! ```
//! Period 1 of the power day starts at 23:00 of the previous day, so row `i`
//! is labelled `(23 + i) % 24`.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sink::{BoxFuture, PositionSink};
use chrono::DateTime;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use powerpos_core::PERIODS_PER_DAY;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Serializes file writes across all writers in the process.
static WRITE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const HEADER: &str = "LocalTime,Volume";

/// `PowerPosition_<YYYYMMDD>_<HHMM>.csv` for the given local time.
#[must_use]
pub fn file_name(timestamp: DateTime<Tz>) -> String {
    format!("PowerPosition_{}.csv", timestamp.format("%Y%m%d_%H%M"))
}

/// Local start hour of the period at `index`, e.g. `23:00` for index 0.
#[must_use]
pub fn hour_label(index: usize) -> String {
    format!("{:02}:00", (23 + index) % 24)
}

/// Writes one CSV file per position.
#[derive(Debug, Clone)]
pub struct CsvPositionWriter {
    periods: usize,
}

impl CsvPositionWriter {
    /// Writer for positions of `periods` buckets.
    #[must_use]
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }

    #[must_use]
    pub fn periods(&self) -> usize {
        self.periods
    }

    fn write_file(path: &Path, position: &[f64]) -> io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{HEADER}")?;
        for (index, volume) in position.iter().enumerate() {
            writeln!(writer, "{},{}", hour_label(index), volume)?;
        }
        writer.flush()
    }
}

impl Default for CsvPositionWriter {
    fn default() -> Self {
        Self::new(PERIODS_PER_DAY)
    }
}

impl PositionSink for CsvPositionWriter {
    fn persist<'a>(
        &'a self,
        position: &'a [f64],
        dir: &'a Path,
        timestamp: DateTime<Tz>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, PersistenceResult<PathBuf>> {
        Box::pin(async move {
            if position.len() != self.periods {
                return Err(PersistenceError::InvalidSnapshot {
                    expected: self.periods,
                    actual: position.len(),
                });
            }

            let path = dir.join(file_name(timestamp));

            let _guard = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(PersistenceError::Cancelled),
                guard = WRITE_LOCK.lock() => guard,
            };
            debug!(path = %path.display(), "Writing position");

            // Once started, a write runs to completion
            let target = path.clone();
            let rows = position.to_vec();
            tokio::task::spawn_blocking(move || Self::write_file(&target, &rows))
                .await
                .map_err(|e| io::Error::other(format!("write task failed: {e}")))??;

            info!(path = %path.display(), rows = position.len(), "Position written");
            Ok(path)
        })
    }
}

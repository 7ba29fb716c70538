//! Position sink trait.

use crate::error::PersistenceResult;
use chrono::DateTime;
use chrono_tz::Tz;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Destination for calculated positions.
pub trait PositionSink: Send + Sync {
    /// Persist `position` under `dir`, labelled with `timestamp`.
    ///
    /// Returns the path written.
    fn persist<'a>(
        &'a self,
        position: &'a [f64],
        dir: &'a Path,
        timestamp: DateTime<Tz>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, PersistenceResult<PathBuf>>;
}

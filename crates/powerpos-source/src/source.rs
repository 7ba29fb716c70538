//! Trade source trait.

use crate::error::SourceResult;
use chrono::DateTime;
use chrono_tz::Tz;
use powerpos_core::TradeRecord;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Provider of the trades contributing to a power position.
pub trait TradeSource: Send + Sync {
    /// Fetch all trades for the power day containing `target`.
    ///
    /// Implementations should return [`crate::SourceError::Cancelled`]
    /// promptly once `cancel` fires.
    fn fetch<'a>(
        &'a self,
        target: DateTime<Tz>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<Vec<TradeRecord>>>;
}

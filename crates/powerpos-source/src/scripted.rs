//! Deterministic trade source.
//!
//! Returns queued failures first, then the same trade list on every call.

use crate::error::{SourceError, SourceResult};
use crate::source::{BoxFuture, TradeSource};
use chrono::DateTime;
use chrono_tz::Tz;
use parking_lot::Mutex;
use powerpos_core::TradeRecord;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Trade source replaying a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedTradeSource {
    trades: Vec<TradeRecord>,
    failures: Mutex<VecDeque<SourceError>>,
    targets: Mutex<Vec<DateTime<Tz>>>,
}

impl ScriptedTradeSource {
    /// Source that always returns `trades`.
    #[must_use]
    pub fn new(trades: Vec<TradeRecord>) -> Self {
        Self {
            trades,
            ..Default::default()
        }
    }

    /// Fail the next calls with `failures`, in order, before returning trades.
    #[must_use]
    pub fn with_failures(self, failures: impl IntoIterator<Item = SourceError>) -> Self {
        self.failures.lock().extend(failures);
        self
    }

    /// Number of fetch calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.targets.lock().len()
    }

    /// Target times requested so far, in call order.
    #[must_use]
    pub fn targets(&self) -> Vec<DateTime<Tz>> {
        self.targets.lock().clone()
    }
}

impl TradeSource for ScriptedTradeSource {
    fn fetch<'a>(
        &'a self,
        target: DateTime<Tz>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<Vec<TradeRecord>>> {
        Box::pin(async move {
            self.targets.lock().push(target);

            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }

            if let Some(failure) = self.failures.lock().pop_front() {
                return Err(failure);
            }

            Ok(self.trades.clone())
        })
    }
}

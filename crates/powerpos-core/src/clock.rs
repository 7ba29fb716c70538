//! Wall clock pinned to a reference timezone.
//!
//! Target times and output labels are computed in the market's local time
//! (Europe/London by default), independent of the host timezone.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

/// Timezone used when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::London;

/// Source of the current time in a fixed reference timezone.
pub trait Clock: Send + Sync {
    /// Current time in the reference timezone.
    fn now(&self) -> DateTime<Tz>;

    /// The reference timezone.
    fn timezone(&self) -> Tz;
}

/// System clock converted into a reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceClock {
    tz: Tz,
}

impl ReferenceClock {
    /// Create a clock for the given timezone.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Clock for Europe/London.
    #[must_use]
    pub const fn london() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }

    /// Look up a timezone by IANA name (e.g. "Europe/London").
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| CoreError::InvalidTimezone(name.to_string()))
    }
}

impl Default for ReferenceClock {
    fn default() -> Self {
        Self::london()
    }
}

impl Clock for ReferenceClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Tz>>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        *self.now.lock()
    }

    fn timezone(&self) -> Tz {
        self.now.lock().timezone()
    }
}

/// Interpret a naive local time in `tz`.
///
/// Ambiguous times (autumn DST fold) resolve to the earlier instant; times
/// inside the spring DST gap do not exist and are rejected.
pub fn parse_local(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| CoreError::InvalidLocalTime(format!("{naive} does not exist in {tz}")))
}

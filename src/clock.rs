//! Time sources used to stamp ledger records.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of execution timestamps
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that advances by a fixed step on every read.
///
/// Used by tests, benchmarks and replays where report durations must be
/// reproducible.
#[derive(Debug)]
pub struct ManualClock {
    next_millis: AtomicI64,
    step_millis: i64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next_millis: AtomicI64::new(start.timestamp_millis()),
            step_millis: step.num_milliseconds(),
        }
    }

    /// Clock starting at the Unix epoch, ticking one second per read
    pub fn ticking_seconds() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH, Duration::seconds(1))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.next_millis.fetch_add(self.step_millis, Ordering::Relaxed);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_ticks() {
        let clock = ManualClock::ticking_seconds();
        let a = clock.now();
        let b = clock.now();
        assert_eq!((b - a).num_seconds(), 1);
    }
}

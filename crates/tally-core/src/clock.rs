//! Time sources for rate and duration computations
//!
//! [`Clock::time`] returns an opaque [`Time`]; elapsed nanoseconds between two
//! readings come from [`diff`]. Callers treat a clock as non-decreasing.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_MILLI: u64 = 1_000_000;

/// A point in time split into whole milliseconds and the sub-millisecond part
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    /// Milliseconds since the unix epoch
    pub milliseconds: u64,
    /// Nanoseconds within the current millisecond
    pub nanoseconds: u64,
}

impl Time {
    /// Build a time from a total nanosecond count since the epoch
    pub fn from_nanos(nanos: u64) -> Self {
        Self {
            milliseconds: nanos / NANOS_PER_MILLI,
            nanoseconds: nanos % NANOS_PER_MILLI,
        }
    }

    /// Build a time from milliseconds since the epoch
    pub fn from_millis(milliseconds: u64) -> Self {
        Self {
            milliseconds,
            nanoseconds: 0,
        }
    }

    /// Total nanoseconds since the epoch
    pub fn as_nanos(&self) -> u64 {
        self.milliseconds
            .saturating_mul(NANOS_PER_MILLI)
            .saturating_add(self.nanoseconds)
    }

    /// Wall-clock view of this time
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let millis = i64::try_from(self.milliseconds).unwrap_or(i64::MAX);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Nanoseconds elapsed from `one` to `two`
pub fn diff(one: Time, two: Time) -> i64 {
    let millis = two.milliseconds as i64 - one.milliseconds as i64;
    let nanos = two.nanoseconds as i64 - one.nanoseconds as i64;
    millis * NANOS_PER_MILLI as i64 + nanos
}

/// Source of timestamps
pub trait Clock: Send + Sync + Debug {
    /// Current time
    fn time(&self) -> Time;
}

/// Wall clock backed by [`SystemTime`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdClock;

impl StdClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for StdClock {
    fn time(&self) -> Time {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Time {
            milliseconds: since_epoch.as_millis() as u64,
            nanoseconds: u64::from(since_epoch.subsec_nanos()) % NANOS_PER_MILLI,
        }
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at the epoch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock frozen at `millis` milliseconds since the epoch
    pub fn at_millis(millis: u64) -> Self {
        let clock = Self::new();
        clock.set_millis(millis);
        clock
    }

    /// Jump to `millis` milliseconds since the epoch
    pub fn set_millis(&self, millis: u64) {
        self.nanos
            .store(millis.saturating_mul(NANOS_PER_MILLI), Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn time(&self) -> Time {
        Time::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_spans_millisecond_boundary() {
        let a = Time {
            milliseconds: 10,
            nanoseconds: 999_000,
        };
        let b = Time {
            milliseconds: 11,
            nanoseconds: 1_000,
        };
        assert_eq!(diff(a, b), 2_000);
        assert_eq!(diff(b, a), -2_000);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::at_millis(1_000);
        let start = clock.time();
        clock.advance(Duration::from_micros(1_500));
        assert_eq!(diff(start, clock.time()), 1_500_000);
        assert_eq!(clock.time().milliseconds, 1_001);
        assert_eq!(clock.time().nanoseconds, 500_000);
    }

    #[test]
    fn test_to_datetime() {
        let time = Time::from_millis(1_700_000_000_123);
        assert_eq!(time.to_datetime().timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_std_clock_is_after_epoch() {
        let now = StdClock::new().time();
        assert!(now.milliseconds > 0);
        assert!(now.nanoseconds < NANOS_PER_MILLI);
    }
}

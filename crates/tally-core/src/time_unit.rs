//! Time units used for rate conversion and reporting intervals

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::MetricsError;

/// A unit of time with a fixed nanosecond length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Length of one unit in nanoseconds
    pub const fn nanos_per_unit(self) -> u64 {
        match self {
            TimeUnit::Nanosecond => 1,
            TimeUnit::Microsecond => 1_000,
            TimeUnit::Millisecond => 1_000_000,
            TimeUnit::Second => 1_000_000_000,
            TimeUnit::Minute => 60 * 1_000_000_000,
            TimeUnit::Hour => 60 * 60 * 1_000_000_000,
            TimeUnit::Day => 24 * 60 * 60 * 1_000_000_000,
        }
    }

    /// Convert `value` expressed in this unit into `target` units
    pub fn convert_to(self, value: f64, target: TimeUnit) -> f64 {
        value * self.nanos_per_unit() as f64 / target.nanos_per_unit() as f64
    }

    /// Build a duration of `value` units
    pub fn to_duration(self, value: u64) -> Duration {
        Duration::from_nanos(value.saturating_mul(self.nanos_per_unit()))
    }

    /// Lower-case unit name
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Nanosecond => "nanosecond",
            TimeUnit::Microsecond => "microsecond",
            TimeUnit::Millisecond => "millisecond",
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nanosecond" | "nanoseconds" | "ns" => Ok(TimeUnit::Nanosecond),
            "microsecond" | "microseconds" | "us" => Ok(TimeUnit::Microsecond),
            "millisecond" | "milliseconds" | "ms" => Ok(TimeUnit::Millisecond),
            "second" | "seconds" | "s" => Ok(TimeUnit::Second),
            "minute" | "minutes" | "m" => Ok(TimeUnit::Minute),
            "hour" | "hours" | "h" => Ok(TimeUnit::Hour),
            "day" | "days" | "d" => Ok(TimeUnit::Day),
            other => Err(MetricsError::invalid_argument_for(
                "unit",
                format!("unknown time unit '{}'", other),
            )),
        }
    }
}

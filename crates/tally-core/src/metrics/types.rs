//! Capability traits implemented by the metric primitives

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::buckets::Buckets;
use super::metric::Metric;
use super::snapshot::Snapshot;

/// Metrics that hold a running count
pub trait Counting: Metric {
    fn count(&self) -> i64;
}

/// A polymorphic value source
pub trait Gauge: Metric {
    /// Current value
    fn value(&self) -> f64;

    /// Fixed timestamp for point-in-time values such as events
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Metrics tracking exponentially weighted event rates (events per second)
pub trait Metered: Counting {
    fn one_minute_rate(&self) -> f64;
    fn five_minute_rate(&self) -> f64;
    fn fifteen_minute_rate(&self) -> f64;
    fn mean_rate(&self) -> f64;

    /// All three windowed rates at once
    fn rates(&self) -> MeteredRates {
        MeteredRates {
            m1: self.one_minute_rate(),
            m5: self.five_minute_rate(),
            m15: self.fifteen_minute_rate(),
        }
    }
}

/// Metrics whose samples feed percentile snapshots
pub trait Sampling: Metric {
    fn snapshot(&self) -> Box<dyn Snapshot>;
}

/// Metrics counting values per bucket boundary
pub trait BucketCounting: Metric {
    fn buckets(&self) -> Buckets;

    /// `(boundary, count)` pairs in ascending boundary order; a count covers
    /// every value strictly below its boundary
    fn counts(&self) -> Vec<(f64, u64)>;
}

/// Metrics keeping an exact running sum
pub trait Summarizing: Metric {
    fn sum(&self) -> i64;
}

/// The windowed rates of a [`Metered`] metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeteredRates {
    #[serde(with = "crate::json_float")]
    pub m1: f64,
    #[serde(with = "crate::json_float")]
    pub m5: f64,
    #[serde(with = "crate::json_float")]
    pub m15: f64,
}

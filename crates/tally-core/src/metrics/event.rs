//! Events - application computed values with a fixed timestamp

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt::Debug;

use super::metric::{Metric, MetricMeta};
use super::types::Gauge;

/// A one-off value observed at a specific time
#[derive(Debug)]
pub struct Event<T> {
    meta: MetricMeta,
    value: RwLock<Option<T>>,
    time: RwLock<DateTime<Utc>>,
}

impl<T> Event<T> {
    /// Create an event stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self::at(name, Utc::now())
    }

    /// Create an event stamped with `time`
    pub fn at(name: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            value: RwLock::new(None),
            time: RwLock::new(time),
        }
    }

    pub fn with_value(self, value: T) -> Self {
        *self.value.write() = Some(value);
        self
    }

    pub fn set_value(&self, value: T) {
        *self.value.write() = Some(value);
    }

    pub fn time(&self) -> DateTime<Utc> {
        *self.time.read()
    }

    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.time.write() = time;
    }
}

impl<T: Clone> Event<T> {
    pub fn event_value(&self) -> Option<T> {
        self.value.read().clone()
    }
}

impl<T: Send + Sync + Debug> Metric for Event<T> {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl<T> Gauge for Event<T>
where
    T: Into<f64> + Copy + Send + Sync + Debug,
{
    /// NaN while no value has been set
    fn value(&self) -> f64 {
        let value = *self.value.read();
        value.map(|v| v.into()).unwrap_or(f64::NAN)
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.time())
    }
}

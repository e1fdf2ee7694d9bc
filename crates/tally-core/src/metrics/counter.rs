//! Counter metrics - signed and monotonically increasing totals

use std::sync::atomic::{AtomicI64, Ordering};

use super::metric::{Metric, MetricMeta};
use super::types::Counting;
use crate::error::{MetricsError, MetricsResult};

/// Counter that only ever grows
#[derive(Debug)]
pub struct MonotoneCounter {
    meta: MetricMeta,
    count: AtomicI64,
}

impl MonotoneCounter {
    /// Create a new counter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            count: AtomicI64::new(0),
        }
    }

    /// Increment by `value`; negative deltas are rejected and leave the count untouched
    pub fn increment(&self, value: i64) -> MetricsResult<()> {
        if value < 0 {
            return Err(MetricsError::invalid_argument_for(
                "value",
                "MonotoneCounter must not be increased by a negative value",
            ));
        }
        self.count.fetch_add(value, Ordering::Relaxed);
        Ok(())
    }

    /// Increment by 1
    pub fn inc(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Metric for MonotoneCounter {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl Counting for MonotoneCounter {
    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Counter that can move in both directions
#[derive(Debug)]
pub struct Counter {
    meta: MetricMeta,
    count: AtomicI64,
}

impl Counter {
    /// Create a new counter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            count: AtomicI64::new(0),
        }
    }

    /// Add `value` (may be negative)
    pub fn increment(&self, value: i64) {
        self.count.fetch_add(value, Ordering::Relaxed);
    }

    /// Subtract `value`
    pub fn decrement(&self, value: i64) {
        self.count.fetch_sub(value, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.increment(1);
    }

    pub fn dec(&self) {
        self.decrement(1);
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Metric for Counter {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl Counting for Counter {
    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

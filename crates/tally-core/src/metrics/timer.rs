//! Timer metrics - duration distribution plus invocation rate

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::buckets::Buckets;
use super::histogram::Histogram;
use super::meter::Meter;
use super::metric::{Metric, MetricMeta};
use super::reservoir::{Reservoir, SlidingWindowReservoir};
use super::snapshot::Snapshot;
use super::types::{BucketCounting, Counting, Metered, Sampling, Summarizing};
use crate::clock::{diff, Clock, StdClock, Time};
use crate::error::{MetricsError, MetricsResult};
use crate::time_unit::TimeUnit;

/// Measures durations (in nanoseconds) and the rate they are recorded at
#[derive(Debug)]
pub struct Timer {
    meta: MetricMeta,
    clock: Arc<dyn Clock>,
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    /// Timer on the wall clock with a sliding window reservoir and the
    /// default buckets
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parts(
            name,
            Arc::new(StdClock::new()),
            Box::new(SlidingWindowReservoir::default()),
            Buckets::default(),
        )
    }

    pub fn with_parts(
        name: impl Into<String>,
        clock: Arc<dyn Clock>,
        reservoir: Box<dyn Reservoir>,
        buckets: Buckets,
    ) -> Self {
        let name = name.into();
        Self {
            meta: MetricMeta::new(name.clone()),
            histogram: Histogram::new(name.clone(), reservoir, buckets),
            meter: Meter::with_clock(name, clock.clone(), 1.0),
            clock,
        }
    }

    /// Record a duration of `duration` `unit`s
    pub fn add_duration(&self, duration: i64, unit: TimeUnit) -> MetricsResult<()> {
        if duration < 0 {
            return Err(MetricsError::invalid_argument_for(
                "duration",
                format!("timer durations must not be negative, got {}", duration),
            ));
        }
        self.histogram
            .update(unit.convert_to(duration as f64, TimeUnit::Nanosecond));
        self.meter.mark(1);
        Ok(())
    }

    /// Record an elapsed [`Duration`]
    pub fn record(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos as f64);
        self.meter.mark(1);
    }

    /// Run `f` and record how long it took
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let start = self.clock.time();
        let result = f();
        self.record_since(start);
        result
    }

    /// Await `future` and record how long it took, whatever its output
    pub async fn time_async<F: Future>(&self, future: F) -> F::Output {
        let start = self.clock.time();
        let output = future.await;
        self.record_since(start);
        output
    }

    /// Manual start/stop measurement bound to this timer
    pub fn new_stop_watch(&self) -> StopWatch<'_> {
        StopWatch {
            timer: self,
            start: self.clock.time(),
        }
    }

    fn record_since(&self, start: Time) {
        let elapsed = diff(start, self.clock.time()).max(0);
        self.histogram.update(elapsed as f64);
        self.meter.mark(1);
    }
}

impl Metric for Timer {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl Counting for Timer {
    fn count(&self) -> i64 {
        self.histogram.count()
    }
}

impl Metered for Timer {
    fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }

    fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }
}

impl Sampling for Timer {
    fn snapshot(&self) -> Box<dyn Snapshot> {
        self.histogram.snapshot()
    }
}

impl BucketCounting for Timer {
    fn buckets(&self) -> Buckets {
        self.histogram.buckets()
    }

    fn counts(&self) -> Vec<(f64, u64)> {
        self.histogram.counts()
    }
}

impl Summarizing for Timer {
    fn sum(&self) -> i64 {
        self.histogram.sum()
    }
}

/// Measurement in progress; created started
pub struct StopWatch<'a> {
    timer: &'a Timer,
    start: Time,
}

impl<'a> StopWatch<'a> {
    /// Restart the measurement
    pub fn start(&mut self) {
        self.start = self.timer.clock.time();
    }

    /// Record the time since the last start; the watch can be stopped again
    pub fn stop(&self) {
        self.timer.record_since(self.start);
    }

    /// Elapsed time without recording
    pub fn elapsed(&self) -> Duration {
        let nanos = diff(self.start, self.timer.clock.time()).max(0);
        Duration::from_nanos(nanos as u64)
    }
}

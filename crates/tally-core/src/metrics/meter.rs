//! Meter metrics - event rates over 1/5/15 minute windows

use std::sync::Arc;

use parking_lot::Mutex;

use super::metric::{Metric, MetricMeta};
use super::moving_average::{ExponentiallyWeightedMovingAverage, MovingAverage};
use super::types::{Counting, Metered};
use crate::clock::{diff, Clock, StdClock, Time};
use crate::time_unit::TimeUnit;

const SECOND_NANOS: f64 = 1_000_000_000.0;

#[derive(Debug)]
struct MeterState {
    last_time: Time,
    count: i64,
    m1: ExponentiallyWeightedMovingAverage,
    m5: ExponentiallyWeightedMovingAverage,
    m15: ExponentiallyWeightedMovingAverage,
}

impl MeterState {
    fn tick(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.m15.tick();
            self.m5.tick();
            self.m1.tick();
        }
    }
}

/// Event rate tracker
///
/// The moving averages are ticked lazily: every mark and every rate read
/// first folds in the number of whole sample intervals elapsed since the
/// previous tick.
#[derive(Debug)]
pub struct Meter {
    meta: MetricMeta,
    clock: Arc<dyn Clock>,
    start_time: Time,
    interval_nanos: f64,
    state: Mutex<MeterState>,
}

impl Meter {
    /// Meter on the wall clock sampled once per second
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, Arc::new(StdClock::new()), 1.0)
    }

    /// Meter on `clock` sampled `sample_rate` times per second
    ///
    /// A non-positive or non-finite rate falls back to once per second.
    pub fn with_clock(name: impl Into<String>, clock: Arc<dyn Clock>, sample_rate: f64) -> Self {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            1.0
        };
        let start_time = clock.time();
        Self {
            meta: MetricMeta::new(name),
            clock,
            start_time,
            interval_nanos: SECOND_NANOS / sample_rate,
            state: Mutex::new(MeterState {
                last_time: start_time,
                count: 0,
                m1: ExponentiallyWeightedMovingAverage::one_minute(),
                m5: ExponentiallyWeightedMovingAverage::five_minutes(),
                m15: ExponentiallyWeightedMovingAverage::fifteen_minutes(),
            }),
        }
    }

    /// Record `value` events
    pub fn mark(&self, value: i64) {
        let mut state = self.state.lock();
        self.tick_if_needed(&mut state);
        state.count += value;
        state.m15.update(value);
        state.m5.update(value);
        state.m1.update(value);
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn tick_if_needed(&self, state: &mut MeterState) {
        let now = self.clock.time();
        let age = diff(state.last_time, now) as f64;
        if age > self.interval_nanos {
            state.last_time = now;
            state.tick((age / self.interval_nanos).floor() as u64);
        }
    }

    fn rate_of(&self, pick: fn(&MeterState) -> &ExponentiallyWeightedMovingAverage) -> f64 {
        let mut state = self.state.lock();
        self.tick_if_needed(&mut state);
        pick(&state).average(TimeUnit::Second)
    }
}

impl Metric for Meter {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl Counting for Meter {
    fn count(&self) -> i64 {
        self.state.lock().count
    }
}

impl Metered for Meter {
    fn one_minute_rate(&self) -> f64 {
        self.rate_of(|state| &state.m1)
    }

    fn five_minute_rate(&self) -> f64 {
        self.rate_of(|state| &state.m5)
    }

    fn fifteen_minute_rate(&self) -> f64 {
        self.rate_of(|state| &state.m15)
    }

    /// Events per second since creation; 0 before the first event
    fn mean_rate(&self) -> f64 {
        let count = self.state.lock().count;
        if count == 0 {
            return 0.0;
        }
        let elapsed = diff(self.start_time, self.clock.time());
        if elapsed <= 0 {
            return 0.0;
        }
        count as f64 / elapsed as f64 * SECOND_NANOS
    }
}

//! Exponentially weighted moving averages

use crate::time_unit::TimeUnit;

/// A moving average fed with raw counts and folded on every tick
pub trait MovingAverage: Send + Sync + std::fmt::Debug {
    /// Add to the uncommitted bucket
    fn update(&mut self, value: i64);

    /// Fold the uncommitted bucket into the average
    fn tick(&mut self);

    /// Average rate expressed per `unit`
    fn average(&self, unit: TimeUnit) -> f64;
}

/// Decay factor for a one minute window sampled every second: `1 - e^(-1/60)`
pub const ALPHA_1_MINUTE_1_SECOND_SAMPLERATE: f64 = 0.016_528_546_178_382_51;
/// Decay factor for a five minute window sampled every second: `1 - e^(-1/300)`
pub const ALPHA_5_MINUTE_1_SECOND_SAMPLERATE: f64 = 0.003_327_783_945_476_725_5;
/// Decay factor for a fifteen minute window sampled every second: `1 - e^(-1/900)`
pub const ALPHA_15_MINUTE_1_SECOND_SAMPLERATE: f64 = 0.001_110_494_055_720_723_2;

/// Standard EWMA: `rate += alpha * (instant - rate)`, seeded by the first tick
#[derive(Debug, Clone)]
pub struct ExponentiallyWeightedMovingAverage {
    alpha: f64,
    interval_nanos: f64,
    current_rate: f64,
    uncounted: i64,
    initialized: bool,
}

impl ExponentiallyWeightedMovingAverage {
    /// Create an average ticked every `interval` `unit`s
    pub fn new(alpha: f64, interval: f64, unit: TimeUnit) -> Self {
        Self {
            alpha,
            interval_nanos: unit.convert_to(interval, TimeUnit::Nanosecond),
            current_rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    pub fn one_minute() -> Self {
        Self::new(ALPHA_1_MINUTE_1_SECOND_SAMPLERATE, 1.0, TimeUnit::Second)
    }

    pub fn five_minutes() -> Self {
        Self::new(ALPHA_5_MINUTE_1_SECOND_SAMPLERATE, 1.0, TimeUnit::Second)
    }

    pub fn fifteen_minutes() -> Self {
        Self::new(ALPHA_15_MINUTE_1_SECOND_SAMPLERATE, 1.0, TimeUnit::Second)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl MovingAverage for ExponentiallyWeightedMovingAverage {
    fn update(&mut self, value: i64) {
        self.uncounted += value;
    }

    fn tick(&mut self) {
        let count = std::mem::take(&mut self.uncounted);
        let instant_rate = count as f64 / self.interval_nanos;
        if self.initialized {
            self.current_rate += self.alpha * (instant_rate - self.current_rate);
        } else {
            self.current_rate = instant_rate;
            self.initialized = true;
        }
    }

    fn average(&self, unit: TimeUnit) -> f64 {
        self.current_rate * unit.nanos_per_unit() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_seeds_rate() {
        let mut avg = ExponentiallyWeightedMovingAverage::one_minute();
        avg.update(3);
        avg.tick();
        assert!((avg.average(TimeUnit::Second) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_decay_towards_zero() {
        let mut avg = ExponentiallyWeightedMovingAverage::one_minute();
        avg.update(60);
        avg.tick();
        avg.tick();
        let expected = 60.0 * (1.0 - ALPHA_1_MINUTE_1_SECOND_SAMPLERATE);
        assert!((avg.average(TimeUnit::Second) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_constants_match_formula() {
        for (alpha, window) in [
            (ALPHA_1_MINUTE_1_SECOND_SAMPLERATE, 60.0_f64),
            (ALPHA_5_MINUTE_1_SECOND_SAMPLERATE, 300.0),
            (ALPHA_15_MINUTE_1_SECOND_SAMPLERATE, 900.0),
        ] {
            assert!((alpha - (1.0 - (-1.0 / window).exp())).abs() < 1e-15);
        }
    }

    #[test]
    fn test_average_in_minutes() {
        let mut avg = ExponentiallyWeightedMovingAverage::five_minutes();
        avg.update(2);
        avg.tick();
        assert!((avg.average(TimeUnit::Minute) - 120.0).abs() < 1e-6);
    }
}

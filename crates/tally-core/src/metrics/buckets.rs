//! Histogram bucket boundaries

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};
use crate::json_float::Float;

/// Decimal precision applied by the generators to avoid float drift
pub const DEFAULT_PRECISION: f64 = 10_000.0;

const DEFAULT_BOUNDARIES: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Immutable, ascending list of bucket boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Float>", into = "Vec<Float>")]
pub struct Buckets {
    boundaries: Vec<f64>,
}

impl Buckets {
    /// Validate and wrap explicit boundaries
    pub fn new(boundaries: Vec<f64>) -> MetricsResult<Self> {
        if boundaries.iter().any(|b| b.is_nan()) {
            return Err(MetricsError::invalid_buckets(
                "bucket boundaries must not be NaN",
            ));
        }
        if boundaries.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(MetricsError::invalid_buckets(
                "bucket boundaries must be sorted in ascending order",
            ));
        }
        Ok(Self { boundaries })
    }

    /// No boundaries at all
    pub fn empty() -> Self {
        Self {
            boundaries: Vec::new(),
        }
    }

    /// `count` boundaries starting at `start`, `width` apart
    pub fn linear(start: f64, width: f64, count: usize) -> MetricsResult<Self> {
        Self::linear_with_precision(start, width, count, DEFAULT_PRECISION)
    }

    pub fn linear_with_precision(
        start: f64,
        width: f64,
        count: usize,
        precision: f64,
    ) -> MetricsResult<Self> {
        if count < 1 {
            return Err(MetricsError::invalid_buckets("count needs to be at least 1"));
        }
        if width <= 0.0 || width.is_nan() {
            return Err(MetricsError::invalid_buckets(
                "bucket width needs to be greater than 0.0",
            ));
        }
        let mut boundaries = Vec::with_capacity(count);
        let mut next = start;
        for _ in 0..count {
            boundaries.push(truncate(next, precision));
            next += width;
        }
        Ok(Self { boundaries })
    }

    /// `count` boundaries starting at `initial`, each `factor` times the previous
    pub fn exponential(initial: f64, factor: f64, count: usize) -> MetricsResult<Self> {
        Self::exponential_with_precision(initial, factor, count, DEFAULT_PRECISION)
    }

    pub fn exponential_with_precision(
        initial: f64,
        factor: f64,
        count: usize,
        precision: f64,
    ) -> MetricsResult<Self> {
        if initial <= 0.0 || initial.is_nan() {
            return Err(MetricsError::invalid_buckets(
                "initial value needs to be greater than 0.0",
            ));
        }
        if count < 1 {
            return Err(MetricsError::invalid_buckets("count needs to be at least 1"));
        }
        if factor <= 1.0 || factor.is_nan() {
            return Err(MetricsError::invalid_buckets(
                "factor needs to be greater than 1.0",
            ));
        }
        let mut boundaries = Vec::with_capacity(count);
        boundaries.push(initial);
        for i in 1..count {
            boundaries.push(truncate(boundaries[i - 1] * factor, precision));
        }
        Ok(Self { boundaries })
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            boundaries: DEFAULT_BOUNDARIES.to_vec(),
        }
    }
}

impl TryFrom<Vec<f64>> for Buckets {
    type Error = MetricsError;

    fn try_from(boundaries: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(boundaries)
    }
}

impl From<Buckets> for Vec<f64> {
    fn from(buckets: Buckets) -> Self {
        buckets.boundaries
    }
}

impl TryFrom<Vec<Float>> for Buckets {
    type Error = MetricsError;

    fn try_from(boundaries: Vec<Float>) -> Result<Self, Self::Error> {
        Self::new(boundaries.into_iter().map(f64::from).collect())
    }
}

impl From<Buckets> for Vec<Float> {
    fn from(buckets: Buckets) -> Self {
        buckets.boundaries.into_iter().map(Float).collect()
    }
}

fn truncate(value: f64, precision: f64) -> f64 {
    (value * precision).floor() / precision
}

//! High dynamic range sampler backed by the `hdrhistogram` crate

use hdrhistogram::Histogram as HdrHistogram;

use super::snapshot::Snapshot;
use crate::error::{MetricsError, MetricsResult};

/// Bounded-memory sampler with precise extreme percentiles
///
/// Samples are recorded as whole numbers; negative and non-finite values
/// are recorded as 0 and values above the upper bound saturate.
#[derive(Debug, Clone)]
pub struct HdrSampler {
    histogram: HdrHistogram<u64>,
}

impl HdrSampler {
    pub fn new(lowest: u64, highest: u64, significant_figures: u8) -> MetricsResult<Self> {
        let histogram = HdrHistogram::new_with_bounds(lowest.max(1), highest, significant_figures)
            .map_err(|e| {
                MetricsError::invalid_argument_for(
                    "bounds",
                    format!("cannot create HDR histogram: {:?}", e),
                )
            })?;
        Ok(Self { histogram })
    }

    pub fn record(&mut self, value: f64) {
        let value = if value.is_finite() && value > 0.0 {
            value.round() as u64
        } else {
            0
        };
        self.histogram.saturating_record(value);
    }

    pub fn snapshot(&self) -> HdrSnapshot {
        HdrSnapshot {
            histogram: self.histogram.clone(),
        }
    }
}

/// Snapshot over a copy of the HDR structure; it retains no raw samples
#[derive(Debug, Clone)]
pub struct HdrSnapshot {
    histogram: HdrHistogram<u64>,
}

impl Snapshot for HdrSnapshot {
    fn value(&self, quantile: f64) -> f64 {
        if self.histogram.is_empty() || quantile.is_nan() {
            return 0.0;
        }
        self.histogram.value_at_quantile(quantile.clamp(0.0, 1.0)) as f64
    }

    fn values(&self) -> Vec<f64> {
        Vec::new()
    }

    fn size(&self) -> usize {
        self.histogram.len() as usize
    }

    fn min(&self) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.min() as f64
    }

    fn max(&self) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.max() as f64
    }

    fn mean(&self) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.mean()
    }

    fn std_dev(&self) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.stdev()
    }
}

//! Histogram metrics - bucket counts, exact sums and sampled distributions

use parking_lot::Mutex;

use super::buckets::Buckets;
use super::metric::{Metric, MetricMeta};
use super::reservoir::{Reservoir, SlidingWindowReservoir};
use super::snapshot::Snapshot;
use super::types::{BucketCounting, Counting, Sampling, Summarizing};

#[cfg(feature = "hdr")]
use super::hdr::HdrSampler;
#[cfg(feature = "hdr")]
use crate::error::MetricsResult;

#[derive(Debug)]
enum Sampler {
    Reservoir(Box<dyn Reservoir>),
    #[cfg(feature = "hdr")]
    Hdr(HdrSampler),
}

impl Sampler {
    fn update(&mut self, value: f64) {
        match self {
            Sampler::Reservoir(reservoir) => reservoir.update(value),
            #[cfg(feature = "hdr")]
            Sampler::Hdr(hdr) => hdr.record(value),
        }
    }

    fn snapshot(&self) -> Box<dyn Snapshot> {
        match self {
            Sampler::Reservoir(reservoir) => Box::new(reservoir.snapshot()),
            #[cfg(feature = "hdr")]
            Sampler::Hdr(hdr) => Box::new(hdr.snapshot()),
        }
    }
}

#[derive(Debug)]
struct HistogramState {
    count: i64,
    sum: i64,
    buckets: Buckets,
    bucket_counts: Vec<u64>,
    sampler: Sampler,
}

/// Histogram metric (distribution tracking)
///
/// Bucket counts are cumulative: a value increments every bucket whose
/// boundary is strictly greater than the value. Percentiles come from the
/// sampler and are independent of the buckets. The sum accumulates the
/// integral part of every value in a 64-bit integer.
#[derive(Debug)]
pub struct Histogram {
    meta: MetricMeta,
    state: Mutex<HistogramState>,
}

impl Histogram {
    /// Create a histogram sampling into `reservoir`
    pub fn new(name: impl Into<String>, reservoir: Box<dyn Reservoir>, buckets: Buckets) -> Self {
        Self::with_sampler(name, Sampler::Reservoir(reservoir), buckets)
    }

    /// Sliding window of the default size with the default buckets
    pub fn sliding_window(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Box::new(SlidingWindowReservoir::default()),
            Buckets::default(),
        )
    }

    /// Create a histogram backed by a high dynamic range sampler
    ///
    /// `highest` must be at least twice `lowest` and `significant_figures`
    /// must be between 0 and 5.
    #[cfg(feature = "hdr")]
    pub fn hdr(
        name: impl Into<String>,
        lowest: u64,
        highest: u64,
        significant_figures: u8,
        buckets: Buckets,
    ) -> MetricsResult<Self> {
        let sampler = HdrSampler::new(lowest, highest, significant_figures)?;
        Ok(Self::with_sampler(name, Sampler::Hdr(sampler), buckets))
    }

    fn with_sampler(name: impl Into<String>, sampler: Sampler, buckets: Buckets) -> Self {
        let bucket_counts = vec![0; buckets.len()];
        Self {
            meta: MetricMeta::new(name),
            state: Mutex::new(HistogramState {
                count: 0,
                sum: 0,
                buckets,
                bucket_counts,
                sampler,
            }),
        }
    }

    /// Record a value
    pub fn update(&self, value: f64) {
        let mut state = self.state.lock();
        state.count += 1;
        state.sum = state.sum.wrapping_add(value as i64);

        let HistogramState {
            buckets,
            bucket_counts,
            ..
        } = &mut *state;
        for (boundary, count) in buckets.boundaries().iter().zip(bucket_counts.iter_mut()) {
            if value < *boundary {
                *count += 1;
            }
        }

        state.sampler.update(value);
    }

    /// Whether percentiles come from the high dynamic range sampler
    pub fn is_hdr(&self) -> bool {
        match self.state.lock().sampler {
            Sampler::Reservoir(_) => false,
            #[cfg(feature = "hdr")]
            Sampler::Hdr(_) => true,
        }
    }
}

impl Metric for Histogram {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl Counting for Histogram {
    fn count(&self) -> i64 {
        self.state.lock().count
    }
}

impl Summarizing for Histogram {
    fn sum(&self) -> i64 {
        self.state.lock().sum
    }
}

impl Sampling for Histogram {
    fn snapshot(&self) -> Box<dyn Snapshot> {
        self.state.lock().sampler.snapshot()
    }
}

impl BucketCounting for Histogram {
    fn buckets(&self) -> Buckets {
        self.state.lock().buckets.clone()
    }

    fn counts(&self) -> Vec<(f64, u64)> {
        let state = self.state.lock();
        state
            .buckets
            .boundaries()
            .iter()
            .copied()
            .zip(state.bucket_counts.iter().copied())
            .collect()
    }
}

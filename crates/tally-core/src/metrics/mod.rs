//! Metric primitives
//!
//! - Counters: signed and monotone event counts
//! - Gauges: point-in-time values, including size gauges and events
//! - Histograms: bucket counts, sums and sampled distributions
//! - Meters: event rates over moving windows
//! - Timers: duration distributions combined with invocation rates

mod buckets;
mod counter;
mod event;
mod gauge;
#[cfg(feature = "hdr")]
mod hdr;
mod histogram;
mod meter;
mod metric;
mod moving_average;
mod reservoir;
mod snapshot;
mod timer;
mod types;


pub use buckets::Buckets;
pub use counter::{Counter, MonotoneCounter};
pub use event::Event;
pub use gauge::{SimpleGauge, SizeGauge, Sizeable};
#[cfg(feature = "hdr")]
pub use hdr::{HdrSampler, HdrSnapshot};
pub use histogram::Histogram;
pub use meter::Meter;
pub use metric::{Metadata, Metric, MetricMeta, Tags};
pub use moving_average::{
    ExponentiallyWeightedMovingAverage, MovingAverage, ALPHA_15_MINUTE_1_SECOND_SAMPLERATE,
    ALPHA_1_MINUTE_1_SECOND_SAMPLERATE, ALPHA_5_MINUTE_1_SECOND_SAMPLERATE,
};
pub use reservoir::{DefaultReservoir, Reservoir, SlidingWindowReservoir, DEFAULT_RESERVOIR_SIZE};
pub use snapshot::{SerializedSnapshot, SimpleSnapshot, Snapshot};
pub use timer::{StopWatch, Timer};
pub use types::{BucketCounting, Counting, Gauge, MeteredRates, Metered, Sampling, Summarizing};

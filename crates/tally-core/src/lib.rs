//! Tally Core Library
//!
//! Metric primitives (counters, gauges, histograms, meters, timers), the
//! reservoirs and moving averages behind them, the metric registry, and the
//! live/serialized projection that reporters consume.

pub mod clock;
pub mod error;
pub mod json_float;
pub mod metrics;
pub mod projection;
pub mod registry;
pub mod time_unit;

// Re-export commonly used types
pub use clock::{diff, Clock, ManualClock, StdClock, Time};
pub use error::{MetricsError, MetricsResult};
pub use metrics::{
    Buckets, Counter, Event, Histogram, Meter, Metadata, MeteredRates, MonotoneCounter,
    SimpleGauge, SizeGauge, StopWatch, Tags, Timer,
};
pub use projection::{MetricHandle, SerializedMetric};
pub use registry::{
    ListenerRegistration, MetricRef, MetricRegistry, MetricRegistryListener, MetricSet,
    NameFactory,
};
pub use time_unit::TimeUnit;

/// Capability traits, imported together so metric methods resolve
pub mod prelude {
    pub use crate::metrics::{
        BucketCounting, Counting, Gauge, Metered, Metric, Sampling, Snapshot, Summarizing,
    };
    pub use crate::registry::MetricSet;
}

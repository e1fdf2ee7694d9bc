//! Live and serialized views of a metric
//!
//! Reporters read metrics through [`MetricHandle`], which is either a live
//! registry entry or a [`SerializedMetric`] received from another process.
//! Both answer the same capability checks, so a backend formats them
//! identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metrics::{
    Buckets, Metadata, Metric, MeteredRates, SerializedSnapshot, SimpleSnapshot, Snapshot, Tags,
};
use crate::registry::MetricRef;

/// Plain-data projection of a metric
///
/// Capability fields are present exactly when the source metric has the
/// capability. The sum is carried as a decimal string so 64-bit values
/// survive JSON transports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::json_float::option")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Buckets>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::json_float::option_pairs"
    )]
    pub counts: Option<Vec<(f64, u64)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SerializedSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::json_float::option")]
    pub mean_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rates: Option<MeteredRates>,
}

impl SerializedMetric {
    /// Capture the current state of a live metric
    pub fn from_live(metric: &MetricRef) -> Self {
        let counting = metric.as_counting();
        let gauge = metric.as_gauge();
        let metered = metric.as_metered();
        let sampling = metric.as_sampling();
        let bucket_counting = metric.as_bucket_counting();

        Self {
            id: Some(metric.id()),
            name: metric.name(),
            group: metric.group(),
            description: metric.description(),
            tags: metric.tags(),
            metadata: metric.metadata(),
            count: counting.map(|m| m.count()),
            value: gauge.map(|g| g.value()),
            time: gauge.and_then(|g| g.timestamp()),
            sum: metric.as_summarizing().map(|m| m.sum().to_string()),
            buckets: bucket_counting.map(|m| m.buckets()),
            counts: bucket_counting.map(|m| m.counts()),
            snapshot: sampling.map(|m| SerializedSnapshot {
                values: m.snapshot().values(),
            }),
            mean_rate: metered.map(|m| m.mean_rate()),
            rates: metered.map(|m| m.rates()),
        }
    }
}

/// A metric as seen by reporters
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Live(MetricRef),
    Serialized(SerializedMetric),
}

impl MetricHandle {
    /// Registry identity; serialized metrics carry the id of their origin
    pub fn id(&self) -> Option<u64> {
        match self {
            MetricHandle::Live(metric) => Some(metric.id()),
            MetricHandle::Serialized(metric) => metric.id,
        }
    }

    pub fn name(&self) -> String {
        match self {
            MetricHandle::Live(metric) => metric.name(),
            MetricHandle::Serialized(metric) => metric.name.clone(),
        }
    }

    pub fn group(&self) -> Option<String> {
        match self {
            MetricHandle::Live(metric) => metric.group(),
            MetricHandle::Serialized(metric) => metric.group.clone(),
        }
    }

    pub fn description(&self) -> Option<String> {
        match self {
            MetricHandle::Live(metric) => metric.description(),
            MetricHandle::Serialized(metric) => metric.description.clone(),
        }
    }

    pub fn tags(&self) -> Tags {
        match self {
            MetricHandle::Live(metric) => metric.tags(),
            MetricHandle::Serialized(metric) => metric.tags.clone(),
        }
    }

    pub fn metadata(&self) -> Metadata {
        match self {
            MetricHandle::Live(metric) => metric.metadata(),
            MetricHandle::Serialized(metric) => metric.metadata.clone(),
        }
    }

    pub fn metadata_value(&self, name: &str) -> Option<Value> {
        match self {
            MetricHandle::Live(metric) => metric.metadata_value(name),
            MetricHandle::Serialized(metric) => metric.metadata.get(name).cloned(),
        }
    }

    pub fn count(&self) -> Option<i64> {
        match self {
            MetricHandle::Live(metric) => metric.as_counting().map(|m| m.count()),
            MetricHandle::Serialized(metric) => metric.count,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            MetricHandle::Live(metric) => metric.as_gauge().map(|g| g.value()),
            MetricHandle::Serialized(metric) => metric.value,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            MetricHandle::Live(metric) => metric.as_gauge().and_then(|g| g.timestamp()),
            MetricHandle::Serialized(metric) => metric.time,
        }
    }

    /// Exact sum; a malformed serialized sum reads as absent
    pub fn sum(&self) -> Option<i64> {
        match self {
            MetricHandle::Live(metric) => metric.as_summarizing().map(|m| m.sum()),
            MetricHandle::Serialized(metric) => {
                metric.sum.as_deref().and_then(|sum| sum.parse().ok())
            }
        }
    }

    pub fn buckets(&self) -> Option<Buckets> {
        match self {
            MetricHandle::Live(metric) => metric.as_bucket_counting().map(|m| m.buckets()),
            MetricHandle::Serialized(metric) => metric.buckets.clone(),
        }
    }

    pub fn counts(&self) -> Option<Vec<(f64, u64)>> {
        match self {
            MetricHandle::Live(metric) => metric.as_bucket_counting().map(|m| m.counts()),
            MetricHandle::Serialized(metric) => metric.counts.clone(),
        }
    }

    pub fn snapshot(&self) -> Option<Box<dyn Snapshot>> {
        match self {
            MetricHandle::Live(metric) => metric.as_sampling().map(|m| m.snapshot()),
            MetricHandle::Serialized(metric) => metric
                .snapshot
                .as_ref()
                .map(|s| Box::new(SimpleSnapshot::from(s)) as Box<dyn Snapshot>),
        }
    }

    pub fn mean_rate(&self) -> Option<f64> {
        match self {
            MetricHandle::Live(metric) => metric.as_metered().map(|m| m.mean_rate()),
            MetricHandle::Serialized(metric) => metric.mean_rate,
        }
    }

    pub fn rates(&self) -> Option<MeteredRates> {
        match self {
            MetricHandle::Live(metric) => metric.as_metered().map(|m| m.rates()),
            MetricHandle::Serialized(metric) => metric.rates,
        }
    }

    pub fn is_counting(&self) -> bool {
        match self {
            MetricHandle::Live(metric) => metric.as_counting().is_some(),
            MetricHandle::Serialized(metric) => metric.count.is_some(),
        }
    }

    pub fn is_gauge(&self) -> bool {
        match self {
            MetricHandle::Live(metric) => metric.as_gauge().is_some(),
            MetricHandle::Serialized(metric) => metric.value.is_some(),
        }
    }

    pub fn is_metered(&self) -> bool {
        match self {
            MetricHandle::Live(metric) => metric.as_metered().is_some(),
            MetricHandle::Serialized(metric) => metric.rates.is_some(),
        }
    }

    pub fn is_sampling(&self) -> bool {
        match self {
            MetricHandle::Live(metric) => metric.as_sampling().is_some(),
            MetricHandle::Serialized(metric) => metric.snapshot.is_some(),
        }
    }

    pub fn is_bucket_counting(&self) -> bool {
        match self {
            MetricHandle::Live(metric) => metric.as_bucket_counting().is_some(),
            MetricHandle::Serialized(metric) => metric.counts.is_some(),
        }
    }

    pub fn is_summarizing(&self) -> bool {
        match self {
            MetricHandle::Live(metric) => metric.as_summarizing().is_some(),
            MetricHandle::Serialized(metric) => metric.sum.is_some(),
        }
    }

    /// Plain-data form of this handle
    pub fn to_serialized(&self) -> SerializedMetric {
        match self {
            MetricHandle::Live(metric) => SerializedMetric::from_live(metric),
            MetricHandle::Serialized(metric) => metric.clone(),
        }
    }
}

impl From<MetricRef> for MetricHandle {
    fn from(metric: MetricRef) -> Self {
        MetricHandle::Live(metric)
    }
}

impl From<SerializedMetric> for MetricHandle {
    fn from(metric: SerializedMetric) -> Self {
        MetricHandle::Serialized(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        Buckets, Counter, Histogram, Meter, SimpleGauge, SlidingWindowReservoir, Timer,
    };
    use crate::time_unit::TimeUnit;
    use std::sync::Arc;

    fn capabilities(handle: &MetricHandle) -> [bool; 6] {
        [
            handle.is_counting(),
            handle.is_gauge(),
            handle.is_metered(),
            handle.is_sampling(),
            handle.is_bucket_counting(),
            handle.is_summarizing(),
        ]
    }

    fn through_json(handle: &MetricHandle) -> MetricHandle {
        let json = serde_json::to_string(&handle.to_serialized()).unwrap();
        MetricHandle::Serialized(serde_json::from_str(&json).unwrap())
    }

    #[test]
    fn test_counter_projection_matches_live() {
        let counter = Arc::new(Counter::new("requests"));
        counter.set_group("http");
        counter.set_tag("host", "a");
        counter.set_metadata("unit", Value::from("req"));
        counter.increment(9);

        let live = MetricHandle::from(MetricRef::from(counter));
        let serialized = through_json(&live);

        assert_eq!(capabilities(&live), [true, false, false, false, false, false]);
        assert_eq!(capabilities(&live), capabilities(&serialized));
        assert_eq!(serialized.name(), "requests");
        assert_eq!(serialized.group().as_deref(), Some("http"));
        assert_eq!(serialized.tags(), live.tags());
        assert_eq!(serialized.metadata_value("unit"), Some(Value::from("req")));
        assert_eq!(serialized.count(), Some(9));
        assert_eq!(serialized.id(), live.id());
    }

    #[test]
    fn test_gauge_and_meter_projection() {
        let gauge = Arc::new(SimpleGauge::new("load"));
        gauge.set_value(0.5);
        let live = MetricHandle::from(MetricRef::gauge(gauge));
        let serialized = through_json(&live);
        assert_eq!(capabilities(&serialized), capabilities(&live));
        assert_eq!(serialized.value(), Some(0.5));

        let meter = Arc::new(Meter::new("events"));
        meter.mark(3);
        let live = MetricHandle::from(MetricRef::from(meter));
        let serialized = through_json(&live);
        assert_eq!(capabilities(&live), [true, false, true, false, false, false]);
        assert_eq!(capabilities(&serialized), capabilities(&live));
        assert_eq!(serialized.count(), Some(3));
    }

    #[test]
    fn test_timer_projection_keeps_distribution() {
        let timer = Arc::new(Timer::new("latency"));
        timer.add_duration(3, TimeUnit::Millisecond).unwrap();
        timer.add_duration(1, TimeUnit::Millisecond).unwrap();

        let live = MetricHandle::from(MetricRef::from(timer));
        let serialized = through_json(&live);

        assert_eq!(capabilities(&live), [true, false, true, true, true, true]);
        assert_eq!(capabilities(&serialized), capabilities(&live));
        assert_eq!(serialized.sum(), Some(4_000_000));
        let snapshot = serialized.snapshot().unwrap();
        assert_eq!(snapshot.size(), 2);
        assert_eq!(snapshot.max(), 3_000_000.0);
    }

    #[test]
    fn test_nan_gauge_stays_a_gauge() {
        let gauge = Arc::new(SimpleGauge::new("ratio"));
        gauge.set_value(f64::NAN);

        let serialized = through_json(&MetricHandle::from(MetricRef::gauge(gauge)));

        assert!(serialized.is_gauge());
        assert!(serialized.value().unwrap().is_nan());
    }

    #[test]
    fn test_non_finite_distribution_survives_json() {
        let histogram = Arc::new(Histogram::new(
            "wait",
            Box::new(SlidingWindowReservoir::new(8)),
            Buckets::new(vec![1.0, f64::INFINITY]).unwrap(),
        ));
        histogram.update(0.5);
        histogram.update(f64::NAN);

        let live = MetricHandle::from(MetricRef::from(histogram));
        let serialized = through_json(&live);

        assert_eq!(capabilities(&serialized), capabilities(&live));
        assert_eq!(serialized.buckets(), live.buckets());
        assert_eq!(serialized.counts(), Some(vec![(1.0, 1), (f64::INFINITY, 1)]));
        let values = serialized.snapshot().unwrap().values();
        assert_eq!(values.len(), 2);
        assert_eq!(values.iter().filter(|v| v.is_nan()).count(), 1);
    }
}

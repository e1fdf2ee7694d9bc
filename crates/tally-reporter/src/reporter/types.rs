//! Report cycle data types

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::{MetricHandle, MetricRegistry, SerializedMetric, Tags};

/// Sink kind handed to [`MetricReporter::handle_results`](super::MetricReporter::handle_results)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Meter,
    Timer,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The six registry views walked by a report cycle, in cycle order
///
/// Monotone and signed counters share the `counter` sink kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    MonotoneCounter,
    Counter,
    Gauge,
    Histogram,
    Meter,
    Timer,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 6] = [
        MetricCategory::MonotoneCounter,
        MetricCategory::Counter,
        MetricCategory::Gauge,
        MetricCategory::Histogram,
        MetricCategory::Meter,
        MetricCategory::Timer,
    ];

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricCategory::MonotoneCounter | MetricCategory::Counter => MetricKind::Counter,
            MetricCategory::Gauge => MetricKind::Gauge,
            MetricCategory::Histogram => MetricKind::Histogram,
            MetricCategory::Meter => MetricKind::Meter,
            MetricCategory::Timer => MetricKind::Timer,
        }
    }

    /// Value compared between cycles to decide whether a metric changed
    ///
    /// Gauges use their value, everything else its count.
    pub fn observed_value(&self, metric: &MetricHandle) -> f64 {
        match self {
            MetricCategory::Gauge => metric.value().unwrap_or(f64::NAN),
            _ => metric.count().map(|c| c as f64).unwrap_or(f64::NAN),
        }
    }
}

/// A metric paired with the backend result it produced
#[derive(Debug, Clone)]
pub struct ReportingResult<T> {
    pub metric: MetricHandle,
    pub result: T,
}

impl<T: Clone> ReportingResult<T> {
    pub fn to_serialized(&self) -> SerializedResult<T> {
        SerializedResult {
            metric: self.metric.to_serialized(),
            result: self.result.clone(),
        }
    }
}

/// Wire form of a [`ReportingResult`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedResult<T> {
    pub metric: SerializedMetric,
    pub result: T,
}

impl<T> From<SerializedResult<T>> for ReportingResult<T> {
    fn from(serialized: SerializedResult<T>) -> Self {
        ReportingResult {
            metric: MetricHandle::Serialized(serialized.metric),
            result: serialized.result,
        }
    }
}

/// State shared by every step of one report cycle
///
/// `result` accumulates output for backends that render the whole cycle
/// into one document; `values` is free-form storage for other backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverallReportContext {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

/// Context handed to the per-metric report hooks
#[derive(Debug, Clone)]
pub struct MetricSetReportContext {
    /// Source registry; absent for events and forwarded results
    pub registry: Option<Arc<MetricRegistry>>,
    pub registry_tags: Tags,
    pub reporter_tags: Tags,
    pub date: DateTime<Utc>,
    pub category: MetricCategory,
    pub metrics: Vec<MetricHandle>,
}

impl MetricSetReportContext {
    pub fn kind(&self) -> MetricKind {
        self.category.kind()
    }

    /// Tags for `metric`: reporter tags, then registry tags, then metric tags
    pub fn build_tags(&self, metric: &MetricHandle) -> Tags {
        build_tags(&self.reporter_tags, &self.registry_tags, &metric.tags())
    }
}

/// Merge tag maps; later maps win on key collisions
pub fn build_tags(reporter: &Tags, registry: &Tags, metric: &Tags) -> Tags {
    let mut tags = reporter.clone();
    tags.extend(registry.iter().map(|(k, v)| (k.clone(), v.clone())));
    tags.extend(metric.iter().map(|(k, v)| (k.clone(), v.clone())));
    tags
}

/// Replace NaN with 0 for backends that cannot transport it
pub fn get_number(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value }
}

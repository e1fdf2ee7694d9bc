//! Shared handles to registered metrics

use std::fmt::Debug;
use std::sync::Arc;

use crate::metrics::{
    BucketCounting, Counter, Counting, Gauge, Histogram, Meter, Metered, Metric, MetricMeta,
    MonotoneCounter, Sampling, Summarizing, Timer,
};

/// A metric made of other metrics
///
/// Registering a set registers its members instead of the set itself.
pub trait MetricSet: Metric {
    fn metric_list(&self) -> Vec<MetricRef>;
}

/// A live metric held by a registry, tagged by its primitive kind
#[derive(Debug, Clone)]
pub enum MetricRef {
    MonotoneCounter(Arc<MonotoneCounter>),
    Counter(Arc<Counter>),
    Gauge(Arc<dyn Gauge>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
    Set(Arc<dyn MetricSet>),
}

impl MetricRef {
    /// Wrap any gauge implementation
    pub fn gauge<G: Gauge + 'static>(gauge: Arc<G>) -> Self {
        MetricRef::Gauge(gauge)
    }

    /// Wrap any metric set implementation
    pub fn set<S: MetricSet + 'static>(set: Arc<S>) -> Self {
        MetricRef::Set(set)
    }

    /// Short kind name used in log lines
    pub fn kind_name(&self) -> &'static str {
        match self {
            MetricRef::MonotoneCounter(_) => "monotone_counter",
            MetricRef::Counter(_) => "counter",
            MetricRef::Gauge(_) => "gauge",
            MetricRef::Histogram(_) => "histogram",
            MetricRef::Meter(_) => "meter",
            MetricRef::Timer(_) => "timer",
            MetricRef::Set(_) => "set",
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, MetricRef::Set(_))
    }

    pub fn as_counting(&self) -> Option<&dyn Counting> {
        match self {
            MetricRef::MonotoneCounter(m) => Some(&**m),
            MetricRef::Counter(m) => Some(&**m),
            MetricRef::Histogram(m) => Some(&**m),
            MetricRef::Meter(m) => Some(&**m),
            MetricRef::Timer(m) => Some(&**m),
            MetricRef::Gauge(_) | MetricRef::Set(_) => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&dyn Gauge> {
        match self {
            MetricRef::Gauge(m) => Some(&**m),
            _ => None,
        }
    }

    pub fn as_metered(&self) -> Option<&dyn Metered> {
        match self {
            MetricRef::Meter(m) => Some(&**m),
            MetricRef::Timer(m) => Some(&**m),
            _ => None,
        }
    }

    pub fn as_sampling(&self) -> Option<&dyn Sampling> {
        match self {
            MetricRef::Histogram(m) => Some(&**m),
            MetricRef::Timer(m) => Some(&**m),
            _ => None,
        }
    }

    pub fn as_bucket_counting(&self) -> Option<&dyn BucketCounting> {
        match self {
            MetricRef::Histogram(m) => Some(&**m),
            MetricRef::Timer(m) => Some(&**m),
            _ => None,
        }
    }

    pub fn as_summarizing(&self) -> Option<&dyn Summarizing> {
        match self {
            MetricRef::Histogram(m) => Some(&**m),
            MetricRef::Timer(m) => Some(&**m),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Arc<dyn MetricSet>> {
        match self {
            MetricRef::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Whether both handles point at the same metric
    pub fn same_metric(&self, other: &MetricRef) -> bool {
        self.id() == other.id()
    }
}

impl Metric for MetricRef {
    fn meta(&self) -> &MetricMeta {
        match self {
            MetricRef::MonotoneCounter(m) => m.meta(),
            MetricRef::Counter(m) => m.meta(),
            MetricRef::Gauge(m) => m.meta(),
            MetricRef::Histogram(m) => m.meta(),
            MetricRef::Meter(m) => m.meta(),
            MetricRef::Timer(m) => m.meta(),
            MetricRef::Set(m) => m.meta(),
        }
    }
}

impl From<Arc<MonotoneCounter>> for MetricRef {
    fn from(metric: Arc<MonotoneCounter>) -> Self {
        MetricRef::MonotoneCounter(metric)
    }
}

impl From<Arc<Counter>> for MetricRef {
    fn from(metric: Arc<Counter>) -> Self {
        MetricRef::Counter(metric)
    }
}

impl From<Arc<Histogram>> for MetricRef {
    fn from(metric: Arc<Histogram>) -> Self {
        MetricRef::Histogram(metric)
    }
}

impl From<Arc<Meter>> for MetricRef {
    fn from(metric: Arc<Meter>) -> Self {
        MetricRef::Meter(metric)
    }
}

impl From<Arc<Timer>> for MetricRef {
    fn from(metric: Arc<Timer>) -> Self {
        MetricRef::Timer(metric)
    }
}

impl From<Arc<dyn Gauge>> for MetricRef {
    fn from(metric: Arc<dyn Gauge>) -> Self {
        MetricRef::Gauge(metric)
    }
}

impl From<Arc<dyn MetricSet>> for MetricRef {
    fn from(metric: Arc<dyn MetricSet>) -> Self {
        MetricRef::Set(metric)
    }
}

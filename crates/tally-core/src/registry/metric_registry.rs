//! Metric registry for managing named metrics

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::listener::{ListenerList, ListenerRegistration, MetricRegistryListener};
use super::metric_ref::{MetricRef, MetricSet};
use crate::clock::{Clock, StdClock};
use crate::metrics::{
    Buckets, Counter, Gauge, Histogram, Meter, Metric, MetricMeta, MonotoneCounter, Reservoir,
    SimpleGauge, SlidingWindowReservoir, Timer,
};

#[cfg(feature = "hdr")]
use crate::error::MetricsResult;

/// Derives the name of a set member registered through [`MetricRegistry::register`]
///
/// Arguments are the base name, the member's own name and the member.
pub type NameFactory = Arc<dyn Fn(&str, &str, &MetricRef) -> String + Send + Sync>;

fn default_name_factory() -> NameFactory {
    Arc::new(|base: &str, name: &str, _: &MetricRef| format!("{}.{}", base, name))
}

#[derive(Debug, Clone)]
struct MetricRegistration {
    name: String,
    metric: MetricRef,
}

/// A named collection of metrics
///
/// The registry is itself a metric (its tags are the registry-level tags
/// reporters merge into every metric) and a [`MetricSet`], so registries
/// can be nested.
pub struct MetricRegistry {
    meta: MetricMeta,
    registrations: RwLock<Vec<MetricRegistration>>,
    listeners: ListenerList,
    next_listener_id: AtomicU64,
    name_factory: RwLock<NameFactory>,
    default_clock: RwLock<Arc<dyn Clock>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::with_name("")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            registrations: RwLock::new(Vec::new()),
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
            name_factory: RwLock::new(default_name_factory()),
            default_clock: RwLock::new(Arc::new(StdClock::new())),
        }
    }

    /// Add a listener; returns a handle that removes it again
    pub fn add_listener(&self, listener: Arc<dyn MetricRegistryListener>) -> ListenerRegistration {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, listener));
        ListenerRegistration::new(id, &self.listeners)
    }

    pub fn set_name_factory(&self, factory: NameFactory) {
        *self.name_factory.write() = factory;
    }

    /// Clock handed to meters and timers created by this registry
    pub fn default_clock(&self) -> Arc<dyn Clock> {
        self.default_clock.read().clone()
    }

    pub fn set_default_clock(&self, clock: Arc<dyn Clock>) {
        *self.default_clock.write() = clock;
    }

    /// Register a metric under its own name
    ///
    /// Sets are expanded recursively: every member is grouped under the
    /// set's name and registered on its own.
    pub fn register_metric(
        &self,
        metric: impl Into<MetricRef>,
        group: Option<&str>,
        description: Option<&str>,
    ) {
        let metric = metric.into();
        Self::apply_group_and_description(&metric, group, description);

        if let MetricRef::Set(set) = &metric {
            let set_name = set.name();
            for member in set.metric_list() {
                member.set_group(&set_name);
                self.register_metric(member, None, None);
            }
            return;
        }

        let name = metric.name();
        self.push(name.clone(), metric.clone());
        self.fire_metric_added(&name, &metric);
    }

    /// Register a metric under `name`, prefixed with its group if it has one
    ///
    /// Set members are named by the registry's [`NameFactory`].
    pub fn register(
        &self,
        name: &str,
        metric: impl Into<MetricRef>,
        group: Option<&str>,
        description: Option<&str>,
    ) {
        let metric = metric.into();
        Self::apply_group_and_description(&metric, group, description);

        let full_name = match metric.group() {
            Some(group) if !group.is_empty() => format!("{}.{}", group, name),
            _ => name.to_string(),
        };
        metric.set_name(&full_name);

        if let MetricRef::Set(set) = &metric {
            let factory = self.name_factory.read().clone();
            for member in set.metric_list() {
                let member_name = (*factory)(name, &member.name(), &member);
                self.register(&member_name, member, None, None);
            }
            return;
        }

        self.push(full_name, metric.clone());
        self.fire_metric_added(name, &metric);
    }

    /// Remove every registration named `name`
    pub fn remove_metrics(&self, name: &str) {
        let removed: Vec<MetricRef> = {
            let mut registrations = self.registrations.write();
            let mut removed = Vec::new();
            registrations.retain(|registration| {
                if registration.name == name {
                    removed.push(registration.metric.clone());
                    false
                } else {
                    true
                }
            });
            removed
        };

        debug!(name = %name, count = removed.len(), "Removed metrics");
        for metric in &removed {
            self.fire_metric_removed(name, metric);
        }
    }

    pub fn new_counter(&self, name: &str, group: Option<&str>) -> Arc<Counter> {
        let counter = Arc::new(Counter::new(name));
        self.register_metric(counter.clone(), group, None);
        counter
    }

    pub fn new_monotone_counter(&self, name: &str, group: Option<&str>) -> Arc<MonotoneCounter> {
        let counter = Arc::new(MonotoneCounter::new(name));
        self.register_metric(counter.clone(), group, None);
        counter
    }

    pub fn new_gauge(&self, name: &str, group: Option<&str>) -> Arc<SimpleGauge> {
        let gauge = Arc::new(SimpleGauge::new(name));
        self.register_metric(MetricRef::gauge(gauge.clone()), group, None);
        gauge
    }

    /// Meter on the registry's default clock sampled once per second
    pub fn new_meter(&self, name: &str, group: Option<&str>) -> Arc<Meter> {
        self.new_meter_with(name, group, self.default_clock(), 1.0)
    }

    pub fn new_meter_with(
        &self,
        name: &str,
        group: Option<&str>,
        clock: Arc<dyn Clock>,
        sample_rate: f64,
    ) -> Arc<Meter> {
        let meter = Arc::new(Meter::with_clock(name, clock, sample_rate));
        self.register_metric(meter.clone(), group, None);
        meter
    }

    /// Histogram with a 1024 sample sliding window and the default buckets
    pub fn new_histogram(&self, name: &str, group: Option<&str>) -> Arc<Histogram> {
        self.new_histogram_with(
            name,
            group,
            Box::new(SlidingWindowReservoir::default()),
            Buckets::default(),
        )
    }

    pub fn new_histogram_with(
        &self,
        name: &str,
        group: Option<&str>,
        reservoir: Box<dyn Reservoir>,
        buckets: Buckets,
    ) -> Arc<Histogram> {
        let histogram = Arc::new(Histogram::new(name, reservoir, buckets));
        self.register_metric(histogram.clone(), group, None);
        histogram
    }

    /// Histogram backed by the high dynamic range sampler
    #[cfg(feature = "hdr")]
    pub fn new_hdr_histogram(
        &self,
        name: &str,
        lowest: u64,
        highest: u64,
        significant_figures: u8,
        group: Option<&str>,
    ) -> MetricsResult<Arc<Histogram>> {
        let histogram = Arc::new(Histogram::hdr(
            name,
            lowest,
            highest,
            significant_figures,
            Buckets::default(),
        )?);
        self.register_metric(histogram.clone(), group, None);
        Ok(histogram)
    }

    /// Timer on the registry's default clock with a 1024 sample sliding
    /// window and the same default buckets as histograms
    pub fn new_timer(&self, name: &str, group: Option<&str>) -> Arc<Timer> {
        self.new_timer_with(
            name,
            group,
            self.default_clock(),
            Box::new(SlidingWindowReservoir::default()),
            Buckets::default(),
        )
    }

    pub fn new_timer_with(
        &self,
        name: &str,
        group: Option<&str>,
        clock: Arc<dyn Clock>,
        reservoir: Box<dyn Reservoir>,
        buckets: Buckets,
    ) -> Arc<Timer> {
        let timer = Arc::new(Timer::with_parts(name, clock, reservoir, buckets));
        self.register_metric(timer.clone(), group, None);
        timer
    }

    /// Registered metrics keyed by registration name; later entries win
    pub fn metrics(&self) -> BTreeMap<String, MetricRef> {
        self.registrations
            .read()
            .iter()
            .map(|registration| (registration.name.clone(), registration.metric.clone()))
            .collect()
    }

    /// Registered metrics in registration order
    pub fn metric_list(&self) -> Vec<MetricRef> {
        self.registrations
            .read()
            .iter()
            .map(|registration| registration.metric.clone())
            .collect()
    }

    pub fn counter_list(&self) -> Vec<Arc<Counter>> {
        self.collect(|metric| match metric {
            MetricRef::Counter(counter) => Some(counter.clone()),
            _ => None,
        })
    }

    /// Monotone counters; signed counters are not included
    pub fn monotone_counter_list(&self) -> Vec<Arc<MonotoneCounter>> {
        self.collect(|metric| match metric {
            MetricRef::MonotoneCounter(counter) => Some(counter.clone()),
            _ => None,
        })
    }

    pub fn gauge_list(&self) -> Vec<Arc<dyn Gauge>> {
        self.collect(|metric| match metric {
            MetricRef::Gauge(gauge) => Some(gauge.clone()),
            _ => None,
        })
    }

    pub fn histogram_list(&self) -> Vec<Arc<Histogram>> {
        self.collect(|metric| match metric {
            MetricRef::Histogram(histogram) => Some(histogram.clone()),
            _ => None,
        })
    }

    pub fn meter_list(&self) -> Vec<Arc<Meter>> {
        self.collect(|metric| match metric {
            MetricRef::Meter(meter) => Some(meter.clone()),
            _ => None,
        })
    }

    pub fn timer_list(&self) -> Vec<Arc<Timer>> {
        self.collect(|metric| match metric {
            MetricRef::Timer(timer) => Some(timer.clone()),
            _ => None,
        })
    }

    pub fn metrics_by_name(&self, name: &str) -> Vec<MetricRef> {
        self.registrations
            .read()
            .iter()
            .filter(|registration| registration.name == name)
            .map(|registration| registration.metric.clone())
            .collect()
    }

    pub fn counters_by_name(&self, name: &str) -> Vec<Arc<Counter>> {
        self.collect_named(name, |metric| match metric {
            MetricRef::Counter(counter) => Some(counter.clone()),
            _ => None,
        })
    }

    pub fn monotone_counters_by_name(&self, name: &str) -> Vec<Arc<MonotoneCounter>> {
        self.collect_named(name, |metric| match metric {
            MetricRef::MonotoneCounter(counter) => Some(counter.clone()),
            _ => None,
        })
    }

    pub fn gauges_by_name(&self, name: &str) -> Vec<Arc<dyn Gauge>> {
        self.collect_named(name, |metric| match metric {
            MetricRef::Gauge(gauge) => Some(gauge.clone()),
            _ => None,
        })
    }

    pub fn histograms_by_name(&self, name: &str) -> Vec<Arc<Histogram>> {
        self.collect_named(name, |metric| match metric {
            MetricRef::Histogram(histogram) => Some(histogram.clone()),
            _ => None,
        })
    }

    pub fn meters_by_name(&self, name: &str) -> Vec<Arc<Meter>> {
        self.collect_named(name, |metric| match metric {
            MetricRef::Meter(meter) => Some(meter.clone()),
            _ => None,
        })
    }

    pub fn timers_by_name(&self, name: &str) -> Vec<Arc<Timer>> {
        self.collect_named(name, |metric| match metric {
            MetricRef::Timer(timer) => Some(timer.clone()),
            _ => None,
        })
    }

    fn apply_group_and_description(
        metric: &MetricRef,
        group: Option<&str>,
        description: Option<&str>,
    ) {
        if let Some(group) = group.filter(|g| !g.is_empty()) {
            metric.set_group(group);
        }
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            metric.set_description(description);
        }
    }

    fn push(&self, name: String, metric: MetricRef) {
        debug!(name = %name, kind = metric.kind_name(), "Registered metric");
        self.registrations
            .write()
            .push(MetricRegistration { name, metric });
    }

    fn collect<T>(&self, pick: impl Fn(&MetricRef) -> Option<T>) -> Vec<T> {
        self.registrations
            .read()
            .iter()
            .filter_map(|registration| pick(&registration.metric))
            .collect()
    }

    fn collect_named<T>(&self, name: &str, pick: impl Fn(&MetricRef) -> Option<T>) -> Vec<T> {
        self.registrations
            .read()
            .iter()
            .filter(|registration| registration.name == name)
            .filter_map(|registration| pick(&registration.metric))
            .collect()
    }

    // Listeners are copied out so callbacks may add or remove listeners
    fn snapshot_listeners(&self) -> Vec<Arc<dyn MetricRegistryListener>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    fn fire_metric_added(&self, name: &str, metric: &MetricRef) {
        for listener in self.snapshot_listeners() {
            listener.metric_added(name, metric);
        }
    }

    fn fire_metric_removed(&self, name: &str, metric: &MetricRef) {
        for listener in self.snapshot_listeners() {
            listener.metric_removed(name, metric);
        }
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("meta", &self.meta)
            .field("metrics", &self.registrations.read().len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl Metric for MetricRegistry {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl MetricSet for MetricRegistry {
    fn metric_list(&self) -> Vec<MetricRef> {
        MetricRegistry::metric_list(self)
    }
}

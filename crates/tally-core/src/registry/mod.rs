//! Metric registry, metric sets and registry listeners

mod listener;
mod metric_ref;
mod metric_registry;


pub use listener::{ListenerRegistration, MetricRegistryListener};
pub use metric_ref::{MetricRef, MetricSet};
pub use metric_registry::{MetricRegistry, NameFactory};

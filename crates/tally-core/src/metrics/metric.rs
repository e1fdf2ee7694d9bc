//! Metric identity, naming, tags and metadata shared by every primitive

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Flat tag map; later writers win on key collision
pub type Tags = BTreeMap<String, String>;

/// Arbitrary per-metric metadata (for example custom percentile lists)
pub type Metadata = BTreeMap<String, Value>;

static NEXT_METRIC_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
struct MetaInner {
    name: String,
    group: Option<String>,
    description: Option<String>,
    tags: Tags,
    metadata: Metadata,
}

/// Identity and descriptive state of a metric
///
/// The id is assigned once from a process-wide sequence and is what
/// reporters key their change tracking on. Everything else may change over
/// the lifetime of the metric, so it sits behind a lock.
#[derive(Debug)]
pub struct MetricMeta {
    id: u64,
    inner: RwLock<MetaInner>,
}

impl MetricMeta {
    /// Create metadata for a new metric, allocating a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_METRIC_ID.fetch_add(1, Ordering::Relaxed),
            inner: RwLock::new(MetaInner {
                name: name.into(),
                ..MetaInner::default()
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Common capability set of every metric
///
/// All mutators take `&self`: metrics are shared through `Arc` between the
/// instrumented code, registries and reporters.
pub trait Metric: Send + Sync + Debug {
    /// Identity and descriptive state
    fn meta(&self) -> &MetricMeta;

    /// Process-unique id
    fn id(&self) -> u64 {
        self.meta().id
    }

    fn name(&self) -> String {
        self.meta().inner.read().name.clone()
    }

    fn set_name(&self, name: &str) {
        self.meta().inner.write().name = name.to_string();
    }

    fn description(&self) -> Option<String> {
        self.meta().inner.read().description.clone()
    }

    fn set_description(&self, description: &str) {
        self.meta().inner.write().description = Some(description.to_string());
    }

    fn group(&self) -> Option<String> {
        self.meta().inner.read().group.clone()
    }

    fn set_group(&self, group: &str) {
        self.meta().inner.write().group = Some(group.to_string());
    }

    /// Copy of all tags
    fn tags(&self) -> Tags {
        self.meta().inner.read().tags.clone()
    }

    fn tag(&self, name: &str) -> Option<String> {
        self.meta().inner.read().tags.get(name).cloned()
    }

    fn set_tag(&self, name: &str, value: &str) {
        self.meta()
            .inner
            .write()
            .tags
            .insert(name.to_string(), value.to_string());
    }

    /// Replace all tags
    fn set_tags(&self, tags: Tags) {
        self.meta().inner.write().tags = tags;
    }

    /// Merge tags into the existing set
    fn add_tags(&self, tags: &Tags) {
        let mut inner = self.meta().inner.write();
        for (key, value) in tags {
            inner.tags.insert(key.clone(), value.clone());
        }
    }

    fn remove_tag(&self, name: &str) {
        self.meta().inner.write().tags.remove(name);
    }

    fn remove_tags(&self, names: &[&str]) {
        let mut inner = self.meta().inner.write();
        for name in names {
            inner.tags.remove(*name);
        }
    }

    /// Copy of all metadata
    fn metadata(&self) -> Metadata {
        self.meta().inner.read().metadata.clone()
    }

    fn metadata_value(&self, name: &str) -> Option<Value> {
        self.meta().inner.read().metadata.get(name).cloned()
    }

    fn set_metadata(&self, name: &str, value: Value) {
        self.meta()
            .inner
            .write()
            .metadata
            .insert(name.to_string(), value);
    }

    fn remove_metadata(&self, name: &str) -> Option<Value> {
        self.meta().inner.write().metadata.remove(name)
    }

    /// `group.name`, or just `name` for ungrouped metrics
    fn qualified_name(&self) -> String {
        let inner = self.meta().inner.read();
        match &inner.group {
            Some(group) if !group.is_empty() => format!("{}.{}", group, inner.name),
            _ => inner.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Plain {
        meta: MetricMeta,
    }

    impl Metric for Plain {
        fn meta(&self) -> &MetricMeta {
            &self.meta
        }
    }

    fn plain(name: &str) -> Plain {
        Plain {
            meta: MetricMeta::new(name),
        }
    }

    #[test]
    fn test_ids_increase() {
        let a = plain("a");
        let b = plain("b");
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_tags_lifecycle() {
        let metric = plain("requests");
        metric.set_tag("host", "a");
        metric.set_tag("region", "eu");

        let mut extra = Tags::new();
        extra.insert("host".to_string(), "b".to_string());
        metric.add_tags(&extra);
        assert_eq!(metric.tag("host").as_deref(), Some("b"));

        metric.remove_tags(&["host", "region"]);
        assert!(metric.tags().is_empty());
    }

    #[test]
    fn test_metadata() {
        let metric = plain("latency");
        metric.set_metadata("quantiles", json!([0.5, 0.9]));
        assert_eq!(metric.metadata_value("quantiles"), Some(json!([0.5, 0.9])));
        assert_eq!(metric.remove_metadata("quantiles"), Some(json!([0.5, 0.9])));
        assert!(metric.metadata().is_empty());
    }

    #[test]
    fn test_qualified_name() {
        let metric = plain("heap");
        assert_eq!(metric.qualified_name(), "heap");
        metric.set_group("memory");
        assert_eq!(metric.qualified_name(), "memory.heap");
    }
}

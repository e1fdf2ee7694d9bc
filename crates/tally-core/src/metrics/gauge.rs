//! Gauge metrics - stored values and collection sizes

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::metric::{Metric, MetricMeta};
use super::types::Gauge;

/// Gauge holding a value set by the application
#[derive(Debug)]
pub struct SimpleGauge {
    meta: MetricMeta,
    // f64 bit pattern
    value: AtomicU64,
}

impl SimpleGauge {
    /// Create a new gauge reading 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            value: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn set_value(&self, value: f64) {
        self.value.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Metric for SimpleGauge {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl Gauge for SimpleGauge {
    fn value(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }
}

/// Anything with a length or size
pub trait Sizeable: Send + Sync {
    fn size(&self) -> usize;
}

impl<T: Send + Sync> Sizeable for Vec<T> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Send + Sync> Sizeable for VecDeque<T> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<K: Send + Sync, V: Send + Sync, S: Send + Sync> Sizeable for HashMap<K, V, S> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<K: Send + Sync, V: Send + Sync> Sizeable for BTreeMap<K, V> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Send + Sync, S: Send + Sync> Sizeable for HashSet<T, S> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl Sizeable for String {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Sizeable> Sizeable for Mutex<T> {
    fn size(&self) -> usize {
        self.lock().size()
    }
}

impl<T: Sizeable> Sizeable for RwLock<T> {
    fn size(&self) -> usize {
        self.read().size()
    }
}

type SizeExtractor = Box<dyn Fn() -> usize + Send + Sync>;

/// Gauge reporting the current size of a shared collection
pub struct SizeGauge {
    meta: MetricMeta,
    extractor: SizeExtractor,
}

impl SizeGauge {
    /// Track the size of `collection`
    pub fn new<T: Sizeable + 'static>(name: impl Into<String>, collection: Arc<T>) -> Self {
        Self::from_fn(name, move || collection.size())
    }

    /// Track an arbitrary size accessor
    pub fn from_fn(name: impl Into<String>, extractor: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        Self {
            meta: MetricMeta::new(name),
            extractor: Box::new(extractor),
        }
    }
}

impl fmt::Debug for SizeGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeGauge")
            .field("meta", &self.meta)
            .field("size", &(self.extractor)())
            .finish()
    }
}

impl Metric for SizeGauge {
    fn meta(&self) -> &MetricMeta {
        &self.meta
    }
}

impl Gauge for SizeGauge {
    fn value(&self) -> f64 {
        (self.extractor)() as f64
    }
}

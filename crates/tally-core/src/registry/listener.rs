//! Registry change notifications

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::metric_ref::MetricRef;

/// Observer of metric registrations and removals
///
/// Callbacks run synchronously on the registering thread, in listener
/// registration order.
pub trait MetricRegistryListener: Send + Sync {
    fn metric_added(&self, name: &str, metric: &MetricRef);
    fn metric_removed(&self, name: &str, metric: &MetricRef);
}

pub(crate) type ListenerList = Arc<RwLock<Vec<(u64, Arc<dyn MetricRegistryListener>)>>>;

/// Handle returned when a listener is added; removes it on request
#[derive(Debug, Clone)]
pub struct ListenerRegistration {
    id: u64,
    listeners: Weak<RwLock<Vec<(u64, Arc<dyn MetricRegistryListener>)>>>,
}

impl ListenerRegistration {
    pub(crate) fn new(id: u64, listeners: &ListenerList) -> Self {
        Self {
            id,
            listeners: Arc::downgrade(listeners),
        }
    }

    /// Detach the listener; a no-op once the registry is gone
    pub fn remove(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}

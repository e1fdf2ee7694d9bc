//! In-process cluster transport built on broadcast channels

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use super::transport::{ClusterMessage, ClusterTransport, WorkerId};
use crate::error::{ReportError, ReportResult};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug)]
struct Hub {
    master: broadcast::Sender<ClusterMessage>,
    workers: BTreeMap<WorkerId, broadcast::Sender<ClusterMessage>>,
    next_worker: WorkerId,
    capacity: usize,
}

/// A master and any number of workers living in one process
///
/// Every endpoint owns a broadcast channel; sending to an endpoint with no
/// live subscriber fails with [`ReportError::Channel`].
#[derive(Debug, Clone)]
pub struct InMemoryCluster {
    hub: Arc<Mutex<Hub>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cluster whose channels buffer `capacity` messages
    pub fn with_capacity(capacity: usize) -> Self {
        let (master, _) = broadcast::channel(capacity);
        Self {
            hub: Arc::new(Mutex::new(Hub {
                master,
                workers: BTreeMap::new(),
                next_worker: 1,
                capacity,
            })),
        }
    }

    /// Endpoint for the master process
    pub fn master_transport(&self) -> Arc<InMemoryTransport> {
        Arc::new(InMemoryTransport {
            hub: self.hub.clone(),
            worker: None,
        })
    }

    /// Attach a new worker and return its endpoint
    pub fn add_worker(&self) -> Arc<InMemoryTransport> {
        let mut hub = self.hub.lock();
        let id = hub.next_worker;
        hub.next_worker += 1;
        let (sender, _) = broadcast::channel(hub.capacity);
        hub.workers.insert(id, sender);
        Arc::new(InMemoryTransport {
            hub: self.hub.clone(),
            worker: Some(id),
        })
    }

    /// Detach a worker; later sends to it fail
    pub fn remove_worker(&self, worker: WorkerId) -> bool {
        self.hub.lock().workers.remove(&worker).is_some()
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// One endpoint of an [`InMemoryCluster`]
#[derive(Debug)]
pub struct InMemoryTransport {
    hub: Arc<Mutex<Hub>>,
    worker: Option<WorkerId>,
}

fn deliver(
    sender: &broadcast::Sender<ClusterMessage>,
    message: ClusterMessage,
    target: &str,
) -> ReportResult<()> {
    sender
        .send(message)
        .map(|_| ())
        .map_err(|_| ReportError::channel(format!("no subscriber listening on {}", target)))
}

impl ClusterTransport for InMemoryTransport {
    fn send_to_master(&self, payload: Value) -> ReportResult<()> {
        let hub = self.hub.lock();
        let message = ClusterMessage {
            from: self.worker,
            payload,
        };
        deliver(&hub.master, message, "master")
    }

    fn send_to_worker(&self, worker: WorkerId, payload: Value) -> ReportResult<()> {
        let hub = self.hub.lock();
        let sender = hub
            .workers
            .get(&worker)
            .ok_or_else(|| ReportError::channel(format!("unknown worker {}", worker)))?;
        let message = ClusterMessage {
            from: self.worker,
            payload,
        };
        deliver(sender, message, &format!("worker {}", worker))
    }

    fn workers(&self) -> Vec<WorkerId> {
        self.hub.lock().workers.keys().copied().collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<ClusterMessage> {
        let hub = self.hub.lock();
        match self.worker.and_then(|id| hub.workers.get(&id)) {
            Some(sender) => sender.subscribe(),
            None => hub.master.subscribe(),
        }
    }

    fn worker_id(&self) -> Option<WorkerId> {
        self.worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_worker_to_master() {
        let cluster = InMemoryCluster::new();
        let master = cluster.master_transport();
        let worker = cluster.add_worker();
        let mut inbox = master.subscribe();

        worker.send_to_master(json!({"n": 1})).unwrap();

        let message = inbox.recv().await.unwrap();
        assert_eq!(message.from, worker.worker_id());
        assert_eq!(message.payload, json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_master_to_worker() {
        let cluster = InMemoryCluster::new();
        let master = cluster.master_transport();
        let first = cluster.add_worker();
        let second = cluster.add_worker();
        let mut first_inbox = first.subscribe();
        let _second_inbox = second.subscribe();

        assert_eq!(master.workers(), vec![1, 2]);
        master.send_to_worker(1, json!("ping")).unwrap();

        let message = first_inbox.recv().await.unwrap();
        assert_eq!(message.from, None);
        assert_eq!(message.payload, json!("ping"));
    }

    #[test]
    fn test_send_without_subscriber_fails() {
        let cluster = InMemoryCluster::new();
        let worker = cluster.add_worker();
        let err = worker.send_to_master(json!({})).unwrap_err();
        assert_eq!(err.error_code(), "REPORT_CHANNEL");
    }

    #[test]
    fn test_removed_worker_is_unknown() {
        let cluster = InMemoryCluster::new();
        let master = cluster.master_transport();
        let worker = cluster.add_worker();
        let id = worker.worker_id().unwrap();

        assert!(cluster.remove_worker(id));
        assert!(!cluster.remove_worker(id));
        assert!(master.workers().is_empty());
        assert!(master.send_to_worker(id, json!({})).is_err());
    }
}

//! Pull-based collection of worker exposition text

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::message::{ScrapeRequest, ScrapeResponse};
use super::transport::{ClusterTransport, WorkerId};

/// Correlates scrape requests with worker responses by request id
#[derive(Debug, Default)]
pub struct ScrapeCoordinator {
    pending: Mutex<HashMap<String, oneshot::Sender<String>>>,
}

impl ScrapeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker for its exposition text
    ///
    /// Returns one entry per worker in `workers()` order. A worker that does
    /// not answer within `timeout`, or cannot be reached, contributes `""`.
    pub async fn scrape_workers(
        &self,
        transport: &dyn ClusterTransport,
        reporter_type: &str,
        timeout: Duration,
    ) -> Vec<String> {
        let requests = transport
            .workers()
            .into_iter()
            .map(|worker| self.request(transport, worker, reporter_type, timeout));
        join_all(requests).await
    }

    async fn request(
        &self,
        transport: &dyn ClusterTransport,
        worker: WorkerId,
        reporter_type: &str,
        timeout: Duration,
    ) -> String {
        let request = ScrapeRequest::new(reporter_type);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request.id.clone(), tx);

        let payload = match serde_json::to_value(&request) {
            Ok(payload) => payload,
            Err(e) => {
                self.pending.lock().remove(&request.id);
                warn!(error = %e, "Failed to encode scrape request");
                return String::new();
            }
        };
        if let Err(e) = transport.send_to_worker(worker, payload) {
            self.pending.lock().remove(&request.id);
            warn!(worker, error = %e, "Failed to send scrape request");
            return String::new();
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(_)) => String::new(),
            Err(_) => {
                self.pending.lock().remove(&request.id);
                debug!(worker, id = %request.id, "Worker did not answer scrape request in time");
                String::new()
            }
        }
    }

    /// Hand a worker response to its waiting request
    ///
    /// Returns false when nobody waits for the id any more; the response is
    /// dropped.
    pub fn complete(&self, response: ScrapeResponse) -> bool {
        let waiter = self.pending.lock().remove(&response.id);
        match waiter {
            Some(tx) => tx.send(response.metrics_str).is_ok(),
            None => {
                debug!(id = %response.id, "Discarding late scrape response");
                false
            }
        }
    }

    /// Number of requests still waiting for an answer
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{InMemoryCluster, SCRAPE_REQUEST_TYPE};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scrape_without_workers() {
        let cluster = InMemoryCluster::new();
        let master = cluster.master_transport();
        let coordinator = ScrapeCoordinator::new();
        let result = coordinator
            .scrape_workers(master.as_ref(), "exposition", Duration::from_millis(10))
            .await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_collects_answers_and_timeouts() {
        let cluster = InMemoryCluster::new();
        let master = cluster.master_transport();
        let answering = cluster.add_worker();
        let silent = cluster.add_worker();
        let _silent_inbox = silent.subscribe();
        let coordinator = Arc::new(ScrapeCoordinator::new());

        let mut inbox = answering.subscribe();
        let responder_coordinator = coordinator.clone();
        let responder = tokio::spawn(async move {
            let message = inbox.recv().await.unwrap();
            let request: ScrapeRequest = serde_json::from_value(message.payload).unwrap();
            assert_eq!(request.message_type, SCRAPE_REQUEST_TYPE);
            assert!(responder_coordinator.complete(request.respond("worker_metric 1\n")));
        });

        let result = coordinator
            .scrape_workers(master.as_ref(), "exposition", Duration::from_millis(200))
            .await;
        responder.await.unwrap();

        assert_eq!(result, vec!["worker_metric 1\n".to_string(), String::new()]);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn test_late_response_is_discarded() {
        let coordinator = ScrapeCoordinator::new();
        let response = ScrapeRequest::new("exposition").respond("late");
        assert!(!coordinator.complete(response));
    }
}

//! Channel abstraction between worker processes and the master

use std::fmt::Debug;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::ReportResult;

/// Identifier of a worker endpoint
pub type WorkerId = u64;

/// A message delivered by a [`ClusterTransport`]
#[derive(Debug, Clone)]
pub struct ClusterMessage {
    /// Sending worker; `None` when the master sent it
    pub from: Option<WorkerId>,
    pub payload: Value,
}

/// Message passing between one master and its workers
///
/// Each process holds its own transport endpoint. `subscribe` yields the
/// messages addressed to that endpoint.
pub trait ClusterTransport: Send + Sync + Debug {
    /// Send a payload from this worker to the master
    fn send_to_master(&self, payload: Value) -> ReportResult<()>;

    /// Send a payload from the master to one worker
    fn send_to_worker(&self, worker: WorkerId, payload: Value) -> ReportResult<()>;

    /// Workers currently attached
    fn workers(&self) -> Vec<WorkerId>;

    /// Messages addressed to this endpoint
    fn subscribe(&self) -> broadcast::Receiver<ClusterMessage>;

    /// Id of this endpoint; `None` for the master
    fn worker_id(&self) -> Option<WorkerId> {
        None
    }
}

//! Pull-based exposition with worker scrape

use std::sync::Arc;

use parking_lot::Mutex;
use tally_core::prelude::Gauge;
use tally_core::{MetricRegistry, Tags};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::format::ExpositionFormat;
use crate::cluster::{
    is_addressed_to, ClusterMessage, ClusterTransport, ScrapeCoordinator, ScrapeRequest,
    ScrapeResponse, SCRAPE_REQUEST_TYPE, SCRAPE_RESPONSE_TYPE,
};
use crate::config::ReporterOptions;
use crate::error::{ReportError, ReportResult};
use crate::reporter::ReportEngine;

/// Serves exposition text on demand
///
/// On a cluster master, [`metrics_string`](Self::metrics_string) appends the
/// text of every worker that answers within the worker response timeout.
/// Workers never forward report cycles; they answer scrape requests
/// instead, once [`start`](Self::start) runs.
pub struct ExpositionReporter {
    engine: Arc<ReportEngine<ExpositionFormat>>,
    scrape: Arc<ScrapeCoordinator>,
    listener: Mutex<Option<CancellationToken>>,
}

impl ExpositionReporter {
    pub fn new(format: ExpositionFormat, options: ReporterOptions) -> Self {
        Self {
            engine: Arc::new(ReportEngine::new(format, options).without_forwarding()),
            scrape: Arc::new(ScrapeCoordinator::new()),
            listener: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<ReportEngine<ExpositionFormat>> {
        &self.engine
    }

    pub fn add_metric_registry(&self, registry: Arc<MetricRegistry>) {
        self.engine.add_metric_registry(registry);
    }

    pub fn remove_metric_registry(&self, registry: &Arc<MetricRegistry>) -> bool {
        self.engine.remove_metric_registry(registry)
    }

    pub fn tags(&self) -> Tags {
        self.engine.tags()
    }

    pub fn set_tags(&self, tags: Tags) {
        self.engine.set_tags(tags);
    }

    /// Exposition text of this process and, on a master, its workers
    pub async fn metrics_string(&self) -> String {
        let cluster = &self.engine.options().cluster;
        let responses = match cluster.master_transport() {
            Some(transport) => {
                self.scrape
                    .scrape_workers(
                        transport.as_ref(),
                        self.engine.reporter_type(),
                        cluster.worker_response_timeout,
                    )
                    .await
            }
            None => Vec::new(),
        };
        combine(local_exposition(&self.engine).await, responses)
    }

    /// Exposition text of a single event
    pub async fn event_string(&self, event: Arc<dyn Gauge>) -> ReportResult<String> {
        Ok(self.engine.report_event(event).await?.result)
    }

    /// Start answering or collecting scrape messages
    ///
    /// Returns false when not part of a cluster or already started.
    pub fn start(&self) -> bool {
        let cluster = &self.engine.options().cluster;
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        if let Some(transport) = cluster.master_transport() {
            tokio::spawn(collect_responses(
                transport.subscribe(),
                self.scrape.clone(),
                self.engine.reporter_type().to_string(),
                cancel.clone(),
            ));
        } else if let Some(transport) = cluster.worker_transport() {
            tokio::spawn(answer_requests(
                transport.subscribe(),
                transport.clone(),
                self.engine.clone(),
                cancel.clone(),
            ));
        } else {
            return false;
        }
        *listener = Some(cancel);
        true
    }

    pub fn stop(&self) {
        if let Some(cancel) = self.listener.lock().take() {
            cancel.cancel();
        }
    }
}

impl Drop for ExpositionReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Local text, or `None` when no registry is attached
async fn local_exposition(engine: &ReportEngine<ExpositionFormat>) -> Option<String> {
    if engine.registries().is_empty() {
        return None;
    }
    Some(engine.report().await.result)
}

fn combine(local: Option<String>, responses: Vec<String>) -> String {
    match local {
        Some(local) => format!("{}{}", local, responses.join("\n")),
        None => format!("{}\n", responses.join("\n")),
    }
}

async fn collect_responses(
    mut inbox: broadcast::Receiver<ClusterMessage>,
    scrape: Arc<ScrapeCoordinator>,
    reporter_type: String,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            received = inbox.recv() => match received {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(reporter = %reporter_type, skipped, "Scrape listener lagged behind");
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        };
        if !is_addressed_to(&message.payload, SCRAPE_RESPONSE_TYPE, &reporter_type) {
            continue;
        }
        match serde_json::from_value::<ScrapeResponse>(message.payload) {
            Ok(response) => {
                scrape.complete(response);
            }
            Err(e) => debug!(reporter = %reporter_type, error = %e, "Dropping malformed scrape response"),
        }
    }
}

async fn answer_requests(
    mut inbox: broadcast::Receiver<ClusterMessage>,
    transport: Arc<dyn ClusterTransport>,
    engine: Arc<ReportEngine<ExpositionFormat>>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            received = inbox.recv() => match received {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(reporter = %engine.reporter_type(), skipped, "Scrape listener lagged behind");
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        };
        if !is_addressed_to(&message.payload, SCRAPE_REQUEST_TYPE, engine.reporter_type()) {
            continue;
        }
        let request = match serde_json::from_value::<ScrapeRequest>(message.payload) {
            Ok(request) => request,
            Err(e) => {
                debug!(reporter = %engine.reporter_type(), error = %e, "Dropping malformed scrape request");
                continue;
            }
        };

        let metrics = combine(local_exposition(&engine).await, Vec::new());
        let sent = serde_json::to_value(request.respond(metrics))
            .map_err(ReportError::from)
            .and_then(|payload| transport.send_to_master(payload));
        if let Err(e) = sent {
            warn!(reporter = %engine.reporter_type(), error = %e, "Could not send metrics to master");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_without_registries() {
        assert_eq!(combine(None, Vec::new()), "\n");
        assert_eq!(combine(None, vec!["a 1\n".to_string(), String::new()]), "a 1\n\n\n");
    }

    #[test]
    fn test_combine_with_local_text() {
        assert_eq!(
            combine(Some("local 1\n".to_string()), vec!["w 2\n".to_string()]),
            "local 1\nw 2\n"
        );
    }
}

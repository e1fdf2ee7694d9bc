//! The report cycle shared by every backend

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tally_core::prelude::*;
use tally_core::{MetricHandle, MetricRef, MetricRegistry, MetricsError, Tags};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::traits::MetricReporter;
use super::types::{
    build_tags, MetricCategory, MetricKind, MetricSetReportContext, OverallReportContext,
    ReportingResult,
};
use crate::cluster::{
    is_addressed_to, ClusterTransport, InterprocessReportMessage, ReportedMetrics,
    REPORT_MESSAGE_TYPE,
};
use crate::config::ReporterOptions;
use crate::error::{ReportError, ReportResult};

/// Last reported state of one metric
#[derive(Debug, Clone, Copy)]
struct MetricEntry {
    last_value: f64,
    last_report_ms: i64,
}

type CategoryResults<T> = Vec<(MetricCategory, Vec<ReportingResult<T>>)>;

/// Drives a [`MetricReporter`] backend over a set of registries
///
/// One call to [`report`](Self::report) walks every registry, drops metrics
/// that neither changed nor went unreported for `min_reporting_timeout`,
/// turns the rest into backend results and either hands them to the
/// backend or, on a cluster worker, forwards them to the master.
pub struct ReportEngine<R: MetricReporter> {
    backend: Arc<R>,
    options: ReporterOptions,
    tags: RwLock<Tags>,
    registries: RwLock<Vec<Arc<MetricRegistry>>>,
    metric_states: Mutex<HashMap<u64, MetricEntry>>,
    reporter_type: String,
    forwarding: bool,
    listener: Mutex<Option<CancellationToken>>,
}

impl<R: MetricReporter> ReportEngine<R> {
    pub fn new(backend: R, options: ReporterOptions) -> Self {
        Self::with_backend(Arc::new(backend), options)
    }

    /// Build an engine around a shared backend
    pub fn with_backend(backend: Arc<R>, options: ReporterOptions) -> Self {
        let reporter_type = options
            .reporter_type
            .clone()
            .unwrap_or_else(short_type_name::<R>);
        Self {
            backend,
            tags: RwLock::new(options.tags.clone()),
            options,
            registries: RwLock::new(Vec::new()),
            metric_states: Mutex::new(HashMap::new()),
            reporter_type,
            forwarding: true,
            listener: Mutex::new(None),
        }
    }

    /// Always hand results to the local backend, even on a cluster worker
    pub fn without_forwarding(mut self) -> Self {
        self.forwarding = false;
        self
    }

    pub fn backend(&self) -> &Arc<R> {
        &self.backend
    }

    pub fn options(&self) -> &ReporterOptions {
        &self.options
    }

    /// Name that addresses this reporter in cluster messages
    pub fn reporter_type(&self) -> &str {
        &self.reporter_type
    }

    pub fn tags(&self) -> Tags {
        self.tags.read().clone()
    }

    pub fn set_tags(&self, tags: Tags) {
        *self.tags.write() = tags;
    }

    pub fn add_metric_registry(&self, registry: Arc<MetricRegistry>) {
        self.registries.write().push(registry);
    }

    /// Remove a registry by identity; returns whether it was attached
    pub fn remove_metric_registry(&self, registry: &Arc<MetricRegistry>) -> bool {
        let mut registries = self.registries.write();
        match registries.iter().position(|r| Arc::ptr_eq(r, registry)) {
            Some(index) => {
                registries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn registries(&self) -> Vec<Arc<MetricRegistry>> {
        self.registries.read().clone()
    }

    fn forward_transport(&self) -> Option<Arc<dyn ClusterTransport>> {
        if self.forwarding {
            self.options.cluster.worker_transport().cloned()
        } else {
            None
        }
    }

    /// Run one report cycle
    ///
    /// Returns an empty context when no registry is attached or the
    /// backend is not ready. Backend errors are logged, not returned.
    pub async fn report(&self) -> OverallReportContext {
        let mut ctx = OverallReportContext::default();
        let registries = self.registries();
        if registries.is_empty() {
            return ctx;
        }
        if !self.backend.is_ready().await {
            debug!(reporter = %self.reporter_type, "Backend not ready, skipping report cycle");
            return ctx;
        }

        if let Err(e) = self.backend.before_report(&mut ctx).await {
            error!(reporter = %self.reporter_type, error = %e, "before_report failed");
        }
        for registry in registries {
            self.report_registry(&mut ctx, registry).await;
        }
        if let Err(e) = self.backend.after_report(&mut ctx).await {
            error!(reporter = %self.reporter_type, error = %e, "after_report failed");
        }
        ctx
    }

    async fn report_registry(&self, ctx: &mut OverallReportContext, registry: Arc<MetricRegistry>) {
        let date = self.options.clock.time().to_datetime();
        let registry_tags = registry.tags();
        let reporter_tags = self.tags();

        let mut collected: CategoryResults<R::Output> = Vec::with_capacity(MetricCategory::ALL.len());
        for category in MetricCategory::ALL {
            let set_ctx = MetricSetReportContext {
                registry: Some(registry.clone()),
                registry_tags: registry_tags.clone(),
                reporter_tags: reporter_tags.clone(),
                date,
                category,
                metrics: category_metrics(&registry, category),
            };
            let results = self.report_metrics(&set_ctx);
            collected.push((category, results));
        }

        if let Some(transport) = self.forward_transport() {
            let tags = build_tags(&reporter_tags, &registry_tags, &Tags::new());
            if let Err(e) = self.forward(transport.as_ref(), ctx, date, tags, collected) {
                error!(reporter = %self.reporter_type, error = %e, "Failed to forward report to master");
            }
            return;
        }

        for (category, results) in collected {
            let kind = category.kind();
            if let Err(e) = self
                .backend
                .handle_results(ctx, &registry_tags, date, kind, &results)
                .await
            {
                error!(reporter = %self.reporter_type, kind = %kind, error = %e, "Failed to handle results");
            }
        }
    }

    fn report_metrics(&self, ctx: &MetricSetReportContext) -> Vec<ReportingResult<R::Output>> {
        let kind = ctx.kind();
        let date_ms = ctx.date.timestamp_millis();
        ctx.metrics
            .iter()
            .filter(|metric| match metric.id() {
                Some(id) => self.has_changed(id, ctx.category.observed_value(metric), date_ms),
                None => true,
            })
            .filter_map(|metric| {
                self.backend
                    .report_metric(kind, metric, ctx)
                    .map(|result| ReportingResult {
                        metric: metric.clone(),
                        result,
                    })
            })
            .collect()
    }

    /// Whether a metric should be reported at `date_ms`
    ///
    /// True on first sight, when the value moved, or when the last report
    /// is older than the minimum reporting timeout. Records the report
    /// when true.
    fn has_changed(&self, id: u64, value: f64, date_ms: i64) -> bool {
        let timeout = self.options.min_reporting_timeout_ms();
        let mut states = self.metric_states.lock();
        let changed = match states.get(&id) {
            None => true,
            Some(entry) => {
                entry.last_value != value || entry.last_report_ms.saturating_add(timeout) < date_ms
            }
        };
        if changed {
            states.insert(
                id,
                MetricEntry {
                    last_value: value,
                    last_report_ms: date_ms,
                },
            );
        }
        changed
    }

    fn forward(
        &self,
        transport: &dyn ClusterTransport,
        ctx: &OverallReportContext,
        date: DateTime<Utc>,
        tags: Tags,
        collected: CategoryResults<R::Output>,
    ) -> ReportResult<()> {
        let mut metrics = ReportedMetrics::default();
        for (category, results) in collected {
            let serialized = results.iter().map(ReportingResult::to_serialized).collect();
            match category {
                MetricCategory::MonotoneCounter => metrics.monotone_counters = serialized,
                MetricCategory::Counter => metrics.counters = serialized,
                MetricCategory::Gauge => metrics.gauges = serialized,
                MetricCategory::Histogram => metrics.histograms = serialized,
                MetricCategory::Meter => metrics.meters = serialized,
                MetricCategory::Timer => metrics.timers = serialized,
            }
        }
        let message =
            InterprocessReportMessage::new(self.reporter_type.clone(), ctx.clone(), date, tags, metrics);
        transport.send_to_master(serde_json::to_value(&message)?)
    }

    /// Replay a report forwarded by a worker
    ///
    /// Messages of another type or addressed to another reporter are
    /// ignored. Returns whether the message was handled.
    pub async fn handle_report_message(&self, payload: &Value) -> bool {
        if !is_addressed_to(payload, REPORT_MESSAGE_TYPE, &self.reporter_type) {
            debug!(reporter = %self.reporter_type, "Ignoring message not addressed to this reporter");
            return false;
        }
        let message: InterprocessReportMessage<R::Output> = match serde_json::from_value(payload.clone()) {
            Ok(message) => message,
            Err(e) => {
                debug!(reporter = %self.reporter_type, error = %e, "Dropping malformed report message");
                return false;
            }
        };

        let InterprocessReportMessage {
            mut ctx,
            date,
            tags,
            metrics,
            ..
        } = message;
        let groups = [
            (MetricKind::Counter, metrics.monotone_counters),
            (MetricKind::Counter, metrics.counters),
            (MetricKind::Gauge, metrics.gauges),
            (MetricKind::Histogram, metrics.histograms),
            (MetricKind::Meter, metrics.meters),
            (MetricKind::Timer, metrics.timers),
        ];
        for (kind, serialized) in groups {
            let results: Vec<ReportingResult<R::Output>> =
                serialized.into_iter().map(ReportingResult::from).collect();
            if let Err(e) = self
                .backend
                .handle_results(&mut ctx, &tags, date, kind, &results)
                .await
            {
                error!(reporter = %self.reporter_type, kind = %kind, error = %e, "Failed to handle forwarded results");
            }
        }
        true
    }

    /// Report a single gauge-like event immediately
    ///
    /// The event's own timestamp is used when it has one.
    pub async fn report_event(&self, event: Arc<dyn Gauge>) -> ReportResult<OverallReportContext> {
        if !self.backend.is_ready().await {
            return Err(ReportError::not_ready(format!(
                "{} is not ready, wait for start() to complete",
                self.reporter_type
            )));
        }

        let date = event
            .timestamp()
            .unwrap_or_else(|| self.options.clock.time().to_datetime());
        let metric = MetricHandle::from(MetricRef::from(event));
        let set_ctx = MetricSetReportContext {
            registry: None,
            registry_tags: Tags::new(),
            reporter_tags: self.tags(),
            date,
            category: MetricCategory::Gauge,
            metrics: vec![metric.clone()],
        };
        let result = self
            .backend
            .report_gauge(&metric, &set_ctx)
            .ok_or_else(|| MetricsError::invalid_argument_for("value", "Invalid event value"))?;

        let mut ctx = OverallReportContext::default();
        self.backend
            .handle_results(
                &mut ctx,
                &Tags::new(),
                date,
                MetricKind::Gauge,
                &[ReportingResult { metric, result }],
            )
            .await?;
        Ok(ctx)
    }

    pub async fn flush_events(&self) -> ReportResult<()> {
        self.backend.flush_events().await
    }

    /// Start replaying worker reports on the master
    ///
    /// No-op unless this engine is configured as a cluster master. Returns
    /// whether a new listener was spawned.
    pub fn start_listening(self: &Arc<Self>) -> bool {
        let Some(transport) = self.options.cluster.master_transport().cloned() else {
            return false;
        };
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return false;
        }

        let token = CancellationToken::new();
        let cancel = token.clone();
        let mut inbox = transport.subscribe();
        let engine = Arc::downgrade(self);
        let reporter_type = self.reporter_type.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = inbox.recv() => match received {
                        Ok(message) => {
                            let Some(engine) = engine.upgrade() else {
                                break;
                            };
                            engine.handle_report_message(&message.payload).await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(reporter = %reporter_type, skipped, "Report listener lagged behind");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            debug!(reporter = %reporter_type, "Report listener stopped");
        });
        *listener = Some(token);
        true
    }

    pub fn stop_listening(&self) {
        if let Some(token) = self.listener.lock().take() {
            token.cancel();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.lock().is_some()
    }
}

impl<R: MetricReporter> Drop for ReportEngine<R> {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

fn category_metrics(registry: &MetricRegistry, category: MetricCategory) -> Vec<MetricHandle> {
    fn handles<T>(metrics: Vec<T>) -> Vec<MetricHandle>
    where
        MetricRef: From<T>,
    {
        metrics
            .into_iter()
            .map(|m| MetricHandle::from(MetricRef::from(m)))
            .collect()
    }

    match category {
        MetricCategory::MonotoneCounter => handles(registry.monotone_counter_list()),
        MetricCategory::Counter => handles(registry.counter_list()),
        MetricCategory::Gauge => handles(registry.gauge_list()),
        MetricCategory::Histogram => handles(registry.histogram_list()),
        MetricCategory::Meter => handles(registry.meter_list()),
        MetricCategory::Timer => handles(registry.timer_list()),
    }
}

/// Last path segment of a type name, without generic arguments
fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl<R: MetricReporter> std::fmt::Debug for ReportEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportEngine")
            .field("reporter_type", &self.reporter_type)
            .field("registries", &self.registries.read().len())
            .field("forwarding", &self.forwarding)
            .finish()
    }
}

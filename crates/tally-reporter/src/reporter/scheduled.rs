//! Timer-driven report cycles

use std::sync::Arc;

use parking_lot::Mutex;
use tally_core::prelude::Gauge;
use tally_core::{MetricRegistry, Tags};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::engine::ReportEngine;
use super::traits::MetricReporter;
use super::types::OverallReportContext;
use crate::config::{ReporterOptions, ScheduleOptions};
use crate::error::{ReportError, ReportResult};

struct ScheduledTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs a [`ReportEngine`] every `ScheduleOptions::interval()`
///
/// The first cycle fires one interval after [`start`](Self::start). Each
/// tick spawns its cycle, so a slow backend never delays the timer.
pub struct ScheduledMetricReporter<R: MetricReporter> {
    engine: Arc<ReportEngine<R>>,
    schedule: ScheduleOptions,
    task: Mutex<Option<ScheduledTask>>,
}

impl<R: MetricReporter> ScheduledMetricReporter<R> {
    pub fn new(backend: R, options: ReporterOptions, schedule: ScheduleOptions) -> Self {
        Self::from_engine(Arc::new(ReportEngine::new(backend, options)), schedule)
    }

    pub fn from_engine(engine: Arc<ReportEngine<R>>, schedule: ScheduleOptions) -> Self {
        Self {
            engine,
            schedule,
            task: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<ReportEngine<R>> {
        &self.engine
    }

    pub fn schedule(&self) -> ScheduleOptions {
        self.schedule
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Initialise the backend and start the schedule
    ///
    /// Starting a running reporter is a no-op. A master also starts
    /// replaying reports forwarded by its workers.
    pub async fn start(&self) -> ReportResult<()> {
        let interval = self.schedule.interval();
        if interval.is_zero() {
            return Err(ReportError::config_for(
                "report_interval",
                "report interval must be greater than zero",
            ));
        }
        if self.is_running() {
            return Ok(());
        }

        self.engine.backend().init().await?;

        let mut task = self.task.lock();
        if task.is_some() {
            return Ok(());
        }
        self.engine.start_listening();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let engine = Arc::clone(&engine);
                        tokio::spawn(async move {
                            engine.report().await;
                        });
                    }
                }
            }
            debug!(reporter = %engine.reporter_type(), "Report schedule stopped");
        });

        info!(
            reporter = %self.engine.reporter_type(),
            interval_ms = interval.as_millis() as u64,
            "Started scheduled reporting"
        );
        *task = Some(ScheduledTask { cancel, handle });
        Ok(())
    }

    /// Stop the schedule and any report listener; idempotent
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        self.engine.stop_listening();
        if let Some(task) = task {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
    }

    /// Run one report cycle now
    pub async fn report(&self) -> OverallReportContext {
        self.engine.report().await
    }

    pub async fn report_event(&self, event: Arc<dyn Gauge>) -> ReportResult<OverallReportContext> {
        self.engine.report_event(event).await
    }

    pub async fn flush_events(&self) -> ReportResult<()> {
        self.engine.flush_events().await
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
}

impl<R: MetricReporter> Drop for ScheduledMetricReporter<R> {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

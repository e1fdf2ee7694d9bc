//! The backend seam of the reporting engine

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tally_core::{MetricHandle, Tags};

use super::types::{MetricKind, MetricSetReportContext, OverallReportContext, ReportingResult};
use crate::error::ReportResult;

/// A metrics sink driven by a [`ReportEngine`](super::ReportEngine)
///
/// The `report_*` hooks turn one metric into a backend-specific result, or
/// `None` to skip it. `handle_results` transmits the results of one kind.
/// Results cross process boundaries when workers forward to a master, so
/// they must be serializable.
#[async_trait]
pub trait MetricReporter: Send + Sync + 'static {
    type Output: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn report_counter(
        &self,
        counter: &MetricHandle,
        ctx: &MetricSetReportContext,
    ) -> Option<Self::Output>;

    fn report_gauge(&self, gauge: &MetricHandle, ctx: &MetricSetReportContext)
        -> Option<Self::Output>;

    fn report_histogram(
        &self,
        histogram: &MetricHandle,
        ctx: &MetricSetReportContext,
    ) -> Option<Self::Output>;

    fn report_meter(&self, meter: &MetricHandle, ctx: &MetricSetReportContext)
        -> Option<Self::Output>;

    fn report_timer(&self, timer: &MetricHandle, ctx: &MetricSetReportContext)
        -> Option<Self::Output>;

    /// Transmit the results of one metric kind
    async fn handle_results(
        &self,
        ctx: &mut OverallReportContext,
        registry_tags: &Tags,
        date: DateTime<Utc>,
        kind: MetricKind,
        results: &[ReportingResult<Self::Output>],
    ) -> ReportResult<()>;

    /// Called once at the start of every report cycle
    async fn before_report(&self, _ctx: &mut OverallReportContext) -> ReportResult<()> {
        Ok(())
    }

    /// Called once at the end of every report cycle
    async fn after_report(&self, _ctx: &mut OverallReportContext) -> ReportResult<()> {
        Ok(())
    }

    /// Whether the backend can accept results right now
    async fn is_ready(&self) -> bool {
        true
    }

    /// Prepare the backend before the first scheduled cycle
    async fn init(&self) -> ReportResult<()> {
        Ok(())
    }

    /// Push out anything the backend buffers
    async fn flush_events(&self) -> ReportResult<()> {
        Ok(())
    }

    /// Dispatch to the hook matching `kind`
    fn report_metric(
        &self,
        kind: MetricKind,
        metric: &MetricHandle,
        ctx: &MetricSetReportContext,
    ) -> Option<Self::Output> {
        match kind {
            MetricKind::Counter => self.report_counter(metric, ctx),
            MetricKind::Gauge => self.report_gauge(metric, ctx),
            MetricKind::Histogram => self.report_histogram(metric, ctx),
            MetricKind::Meter => self.report_meter(metric, ctx),
            MetricKind::Timer => self.report_timer(metric, ctx),
        }
    }
}

//! Push backend producing line-protocol points
//!
//! A grouped metric becomes a field set on a measurement named after the
//! group (`http requests.count=3i`); an ungrouped one is its own
//! measurement (`requests count=3i`). Points travel through a
//! [`PointSender`].

mod point;
mod sender;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_core::prelude::*;
use tally_core::{MetricHandle, Tags};
use tracing::debug;

pub use point::{FieldValue, MeasurementPoint};
pub use sender::{HttpPointSender, PointSender};

use crate::error::ReportResult;
use crate::reporter::{
    get_number, MetricKind, MetricReporter, MetricSetReportContext, OverallReportContext,
    ReportingResult,
};

/// Backend writing measurement points through a [`PointSender`]
#[derive(Clone)]
pub struct LineProtocolReporter {
    sender: Arc<dyn PointSender>,
}

impl LineProtocolReporter {
    pub fn new(sender: Arc<dyn PointSender>) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> &Arc<dyn PointSender> {
        &self.sender
    }

    fn point(&self, metric: &MetricHandle, ctx: &MetricSetReportContext) -> PointBuilder {
        let measurement = metric.group().unwrap_or_else(|| metric.name());
        let prefix = match metric.group() {
            Some(_) => format!("{}.", metric.name()),
            None => String::new(),
        };
        PointBuilder {
            prefix,
            point: MeasurementPoint::new(measurement, ctx.build_tags(metric), ctx.date),
        }
    }
}

impl fmt::Debug for LineProtocolReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineProtocolReporter").finish_non_exhaustive()
    }
}

struct PointBuilder {
    prefix: String,
    point: MeasurementPoint,
}

impl PointBuilder {
    fn field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.point = self.point.field(format!("{}{}", self.prefix, name), value);
        self
    }

    fn snapshot(self, metric: &MetricHandle) -> Self {
        let Some(snapshot) = metric.snapshot() else {
            return self;
        };
        self.field("max", get_number(snapshot.max()))
            .field("mean", get_number(snapshot.mean()))
            .field("min", get_number(snapshot.min()))
            .field("p50", get_number(snapshot.median()))
            .field("p75", get_number(snapshot.p75()))
            .field("p95", get_number(snapshot.p95()))
            .field("p98", get_number(snapshot.p98()))
            .field("p99", get_number(snapshot.p99()))
            .field("p999", get_number(snapshot.p999()))
            .field("stddev", get_number(snapshot.std_dev()))
    }

    fn rates(self, metric: &MetricHandle) -> Self {
        let rates = metric.rates().unwrap_or_default();
        self.field("m15_rate", get_number(rates.m15))
            .field("m1_rate", get_number(rates.m1))
            .field("m5_rate", get_number(rates.m5))
            .field("mean_rate", get_number(metric.mean_rate().unwrap_or(0.0)))
    }

    fn build(self) -> MeasurementPoint {
        self.point
    }
}

/// Count of a metric worth reporting; zero counts are skipped
fn nonzero_count(metric: &MetricHandle) -> Option<i64> {
    metric.count().filter(|count| *count != 0)
}

#[async_trait]
impl MetricReporter for LineProtocolReporter {
    type Output = MeasurementPoint;

    fn report_counter(
        &self,
        counter: &MetricHandle,
        ctx: &MetricSetReportContext,
    ) -> Option<MeasurementPoint> {
        let count = nonzero_count(counter)?;
        Some(self.point(counter, ctx).field("count", count).build())
    }

    fn report_gauge(&self, gauge: &MetricHandle, ctx: &MetricSetReportContext) -> Option<MeasurementPoint> {
        let value = gauge.value().filter(|v| *v != 0.0 && !v.is_nan())?;
        Some(self.point(gauge, ctx).field("value", value).build())
    }

    fn report_histogram(
        &self,
        histogram: &MetricHandle,
        ctx: &MetricSetReportContext,
    ) -> Option<MeasurementPoint> {
        let count = nonzero_count(histogram)?;
        Some(
            self.point(histogram, ctx)
                .field("count", count)
                .snapshot(histogram)
                .build(),
        )
    }

    fn report_meter(&self, meter: &MetricHandle, ctx: &MetricSetReportContext) -> Option<MeasurementPoint> {
        let count = nonzero_count(meter)?;
        Some(self.point(meter, ctx).field("count", count).rates(meter).build())
    }

    fn report_timer(&self, timer: &MetricHandle, ctx: &MetricSetReportContext) -> Option<MeasurementPoint> {
        let count = nonzero_count(timer)?;
        Some(
            self.point(timer, ctx)
                .field("count", count)
                .rates(timer)
                .snapshot(timer)
                .build(),
        )
    }

    async fn handle_results(
        &self,
        _ctx: &mut OverallReportContext,
        _registry_tags: &Tags,
        _date: DateTime<Utc>,
        kind: MetricKind,
        results: &[ReportingResult<MeasurementPoint>],
    ) -> ReportResult<()> {
        if results.is_empty() {
            return Ok(());
        }
        let points: Vec<MeasurementPoint> = results.iter().map(|r| r.result.clone()).collect();
        let written = points.len();
        self.sender.send(points).await?;
        debug!(kind = %kind, points = written, "Wrote metrics");
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.sender.is_ready().await
    }

    async fn init(&self) -> ReportResult<()> {
        self.sender.init().await
    }
}

//! Backend that writes every result to the tracing log

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::prelude::*;
use tally_core::{MetricHandle, Tags};
use tracing::info;

use crate::error::ReportResult;
use crate::reporter::{
    get_number, MetricKind, MetricReporter, MetricSetReportContext, OverallReportContext,
    ReportingResult,
};

/// Structured fields attached to a [`LogLine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMetadata {
    pub measurement: String,
    pub measurement_type: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    pub timestamp: DateTime<Utc>,
}

/// One rendered metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub message: String,
    pub metadata: LogMetadata,
}

/// Extra consumer of every emitted line
pub type LogSink = Arc<dyn Fn(&LogLine) + Send + Sync>;

/// Reports metrics as human-readable `info` log lines
#[derive(Default, Clone)]
pub struct LoggerReporter {
    sink: Option<LogSink>,
}

impl LoggerReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also hand every line to `sink`
    pub fn with_sink(sink: LogSink) -> Self {
        Self { sink: Some(sink) }
    }

    fn line(&self, metric: &MetricHandle, ctx: &MetricSetReportContext, message: String) -> LogLine {
        LogLine {
            message,
            metadata: LogMetadata {
                measurement: metric.name(),
                measurement_type: ctx.kind(),
                group: metric.group(),
                tags: ctx.build_tags(metric),
                timestamp: ctx.date,
            },
        }
    }

    fn emit(&self, line: &LogLine) {
        info!(
            measurement = %line.metadata.measurement,
            measurement_type = %line.metadata.measurement_type,
            group = ?line.metadata.group,
            tags = ?line.metadata.tags,
            "{}",
            line.message
        );
        if let Some(sink) = &self.sink {
            sink(line);
        }
    }
}

impl fmt::Debug for LoggerReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerReporter")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

fn snapshot_lines(metric: &MetricHandle) -> String {
    let Some(snapshot) = metric.snapshot() else {
        return String::new();
    };
    format!(
        "\n\tmax: {}\n\tmean: {}\n\tmin: {}\n\tp50: {}\n\tp75: {}\n\tp95: {}\n\tp98: {}\n\tp99: {}\n\tp999: {}\n\tstddev: {}",
        get_number(snapshot.max()),
        get_number(snapshot.mean()),
        get_number(snapshot.min()),
        get_number(snapshot.median()),
        get_number(snapshot.p75()),
        get_number(snapshot.p95()),
        get_number(snapshot.p98()),
        get_number(snapshot.p99()),
        get_number(snapshot.p999()),
        get_number(snapshot.std_dev()),
    )
}

fn rate_lines(metric: &MetricHandle) -> String {
    let rates = metric.rates().unwrap_or_default();
    format!(
        "\n\tm15_rate: {}\n\tm5_rate: {}\n\tm1_rate: {}\n\tmean_rate: {}",
        get_number(rates.m15),
        get_number(rates.m5),
        get_number(rates.m1),
        get_number(metric.mean_rate().unwrap_or(0.0)),
    )
}

#[async_trait]
impl MetricReporter for LoggerReporter {
    type Output = LogLine;

    fn report_counter(&self, counter: &MetricHandle, ctx: &MetricSetReportContext) -> Option<LogLine> {
        let count = counter.count()?;
        let message = format!("{} - counter {}: {}", ctx.date.to_rfc3339(), counter.name(), count);
        Some(self.line(counter, ctx, message))
    }

    fn report_gauge(&self, gauge: &MetricHandle, ctx: &MetricSetReportContext) -> Option<LogLine> {
        let value = gauge.value().filter(|v| !v.is_nan())?;
        let message = format!("{} - gauge {}: {}", ctx.date.to_rfc3339(), gauge.name(), value);
        Some(self.line(gauge, ctx, message))
    }

    fn report_histogram(&self, histogram: &MetricHandle, ctx: &MetricSetReportContext) -> Option<LogLine> {
        let count = histogram.count()?;
        let message = format!(
            "{} - histogram {}\n\tcount: {}{}",
            ctx.date.to_rfc3339(),
            histogram.name(),
            count,
            snapshot_lines(histogram)
        );
        Some(self.line(histogram, ctx, message))
    }

    fn report_meter(&self, meter: &MetricHandle, ctx: &MetricSetReportContext) -> Option<LogLine> {
        let count = meter.count()?;
        let message = format!(
            "{} - meter {}\n\tcount: {}{}",
            ctx.date.to_rfc3339(),
            meter.name(),
            count,
            rate_lines(meter)
        );
        Some(self.line(meter, ctx, message))
    }

    fn report_timer(&self, timer: &MetricHandle, ctx: &MetricSetReportContext) -> Option<LogLine> {
        let count = timer.count()?;
        let message = format!(
            "{} - timer {}\n\tcount: {}{}{}",
            ctx.date.to_rfc3339(),
            timer.name(),
            count,
            rate_lines(timer),
            snapshot_lines(timer)
        );
        Some(self.line(timer, ctx, message))
    }

    async fn handle_results(
        &self,
        _ctx: &mut OverallReportContext,
        _registry_tags: &Tags,
        _date: DateTime<Utc>,
        _kind: MetricKind,
        results: &[ReportingResult<LogLine>],
    ) -> ReportResult<()> {
        for result in results {
            self.emit(&result.result);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReporterOptions;
    use crate::reporter::ReportEngine;
    use parking_lot::Mutex;
    use tally_core::{ManualClock, MetricRegistry};

    fn capture() -> (LoggerReporter, Arc<Mutex<Vec<LogLine>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink: LogSink = Arc::new(move |line: &LogLine| captured.lock().push(line.clone()));
        (LoggerReporter::with_sink(sink), lines)
    }

    #[tokio::test]
    async fn test_logs_counter_and_gauge() {
        let (backend, lines) = capture();
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let engine = ReportEngine::new(
            backend,
            ReporterOptions::default().with_clock(clock).with_tag("app", "demo"),
        );
        let registry = Arc::new(MetricRegistry::new());
        registry.new_counter("requests", Some("http")).increment(7);
        registry.new_gauge("unset", None).set_value(f64::NAN);
        engine.add_metric_registry(registry);

        engine.report().await;

        let lines = lines.lock();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.message.ends_with("- counter requests: 7"));
        assert_eq!(line.metadata.measurement, "requests");
        assert_eq!(line.metadata.measurement_type, MetricKind::Counter);
        assert_eq!(line.metadata.group.as_deref(), Some("http"));
        assert_eq!(line.metadata.tags.get("app").map(String::as_str), Some("demo"));
    }

    #[tokio::test]
    async fn test_timer_message_lists_rates_and_percentiles() {
        let (backend, lines) = capture();
        let engine = ReportEngine::new(backend, ReporterOptions::default());
        let registry = Arc::new(MetricRegistry::new());
        registry
            .new_timer("db", None)
            .record(std::time::Duration::from_millis(2));
        engine.add_metric_registry(registry);

        engine.report().await;

        let lines = lines.lock();
        let message = &lines[0].message;
        assert!(message.contains("- timer db\n\tcount: 1"));
        for field in ["m15_rate", "m1_rate", "mean_rate", "p50", "p999", "stddev"] {
            assert!(message.contains(&format!("\n\t{}: ", field)), "missing {}", field);
        }
    }
}

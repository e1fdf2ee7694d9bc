//! Text exposition format

use std::fmt::{self, Write};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::prelude::*;
use tally_core::{MetricHandle, Tags};

use crate::error::{ReportError, ReportResult};
use crate::reporter::{
    MetricCategory, MetricKind, MetricReporter, MetricSetReportContext, OverallReportContext,
    ReportingResult,
};

/// Metadata key holding a timer's summary quantiles
pub const QUANTILES_METADATA: &str = "quantiles";

const EXCLUDED_LABELS: [&str; 2] = ["le", "quantile"];

/// Quantiles emitted for summaries
#[derive(Debug, Clone, PartialEq)]
pub struct Quantiles(Vec<f64>);

impl Quantiles {
    /// Sorted quantiles; each must lie strictly between 0 and 1
    pub fn new(mut boundaries: Vec<f64>) -> ReportResult<Self> {
        if let Some(bad) = boundaries.iter().find(|q| !(**q > 0.0 && **q < 1.0)) {
            return Err(ReportError::config_for(
                "quantiles",
                format!("quantile {} is outside (0, 1)", bad),
            ));
        }
        boundaries.sort_by(f64::total_cmp);
        Ok(Self(boundaries))
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.0
    }

    /// Store these quantiles on a metric's metadata
    pub fn attach(&self, metric: &dyn Metric) {
        metric.set_metadata(QUANTILES_METADATA, Value::from(self.0.clone()));
    }

    /// Quantiles from metadata, falling back to the defaults
    fn of(metric: &MetricHandle) -> Self {
        metric
            .metadata_value(QUANTILES_METADATA)
            .and_then(|value| serde_json::from_value::<Vec<f64>>(value).ok())
            .and_then(|boundaries| Self::new(boundaries).ok())
            .unwrap_or_default()
    }
}

impl Default for Quantiles {
    fn default() -> Self {
        Self(vec![0.01, 0.05, 0.5, 0.75, 0.9, 0.95, 0.98, 0.99, 0.999])
    }
}

/// Exposition metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpositionType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl fmt::Display for ExpositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpositionType::Counter => "counter",
            ExpositionType::Gauge => "gauge",
            ExpositionType::Histogram => "histogram",
            ExpositionType::Summary => "summary",
            ExpositionType::Untyped => "untyped",
        };
        f.write_str(name)
    }
}

/// Per-metric result: sample fields plus normalized labels
///
/// A field named `""` is the bare metric sample; others are emitted as
/// `name_field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpositionResult {
    pub metric_type: ExpositionType,
    pub fields: Vec<(String, String)>,
    pub can_be_reported: bool,
    pub tags: Tags,
}

/// Renders metrics as exposition text into `OverallReportContext::result`
#[derive(Debug, Clone, PartialEq)]
pub struct ExpositionFormat {
    /// Emit `# HELP` and `# TYPE` lines
    pub emit_comments: bool,
    /// Append the report time in milliseconds to every sample
    pub include_timestamp: bool,
    /// Declare every metric as `untyped`
    pub use_untyped: bool,
}

impl Default for ExpositionFormat {
    fn default() -> Self {
        Self {
            emit_comments: true,
            include_timestamp: false,
            use_untyped: false,
        }
    }
}

impl ExpositionFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comments(mut self, emit_comments: bool) -> Self {
        self.emit_comments = emit_comments;
        self
    }

    pub fn with_timestamp(mut self, include_timestamp: bool) -> Self {
        self.include_timestamp = include_timestamp;
        self
    }

    pub fn with_untyped(mut self, use_untyped: bool) -> Self {
        self.use_untyped = use_untyped;
        self
    }

    fn result(
        &self,
        metric: &MetricHandle,
        ctx: &MetricSetReportContext,
        metric_type: ExpositionType,
        fields: Vec<(String, String)>,
    ) -> ExpositionResult {
        ExpositionResult {
            metric_type,
            fields,
            can_be_reported: metric.is_counting() || metric.is_gauge(),
            tags: normalize_tags(&ctx.build_tags(metric)),
        }
    }

    fn count_and_sum(metric: &MetricHandle) -> Vec<(String, String)> {
        vec![
            ("count".to_string(), metric.count().unwrap_or(0).to_string()),
            ("sum".to_string(), metric.sum().unwrap_or(0).to_string()),
        ]
    }

    /// Render one metric, or `""` when it cannot be reported
    pub fn render(&self, date: DateTime<Utc>, metric: &MetricHandle, result: &ExpositionResult) -> String {
        if !result.can_be_reported {
            return String::new();
        }

        let name = metric_name(metric);
        let description = metric
            .description()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("{} description", name));
        let timestamp = if self.include_timestamp {
            format!(" {}", date.timestamp_millis())
        } else {
            String::new()
        };
        let labels = label_string(&result.tags);
        let label_prefix = if labels.is_empty() { "" } else { "," };

        let mut out = String::new();
        if self.emit_comments {
            let metric_type = if self.use_untyped {
                ExpositionType::Untyped
            } else {
                result.metric_type
            };
            let _ = writeln!(out, "# HELP {} {}", name, description);
            let _ = writeln!(out, "# TYPE {} {}", name, metric_type);
        }

        match result.metric_type {
            ExpositionType::Histogram => {
                if metric.buckets().is_some() {
                    for (boundary, count) in metric.counts().unwrap_or_default() {
                        let _ = writeln!(
                            out,
                            "{}_bucket{{{}{}le=\"{}\"}} {}{}",
                            name,
                            labels,
                            label_prefix,
                            format_float(boundary),
                            count,
                            timestamp
                        );
                    }
                    let _ = writeln!(
                        out,
                        "{}_bucket{{{}{}le=\"+Inf\"}} {}{}",
                        name,
                        labels,
                        label_prefix,
                        metric.count().unwrap_or(0),
                        timestamp
                    );
                }
            }
            ExpositionType::Summary => {
                if let Some(snapshot) = metric.snapshot() {
                    for quantile in Quantiles::of(metric).boundaries() {
                        let _ = writeln!(
                            out,
                            "{}{{{}{}quantile=\"{}\"}} {}{}",
                            name,
                            labels,
                            label_prefix,
                            quantile,
                            format_float(snapshot.value(*quantile)),
                            timestamp
                        );
                    }
                }
            }
            _ => {}
        }

        for (field, value) in &result.fields {
            let suffix = if field.is_empty() {
                String::new()
            } else {
                format!("_{}", field)
            };
            let _ = writeln!(out, "{}{}{{{}}} {}{}", name, suffix, labels, value, timestamp);
        }
        out
    }
}

#[async_trait]
impl MetricReporter for ExpositionFormat {
    type Output = ExpositionResult;

    fn report_counter(
        &self,
        counter: &MetricHandle,
        ctx: &MetricSetReportContext,
    ) -> Option<ExpositionResult> {
        let metric_type = match ctx.category {
            MetricCategory::MonotoneCounter => ExpositionType::Counter,
            _ => ExpositionType::Gauge,
        };
        let value = counter.count().unwrap_or(0).to_string();
        Some(self.result(counter, ctx, metric_type, vec![(String::new(), value)]))
    }

    fn report_gauge(&self, gauge: &MetricHandle, ctx: &MetricSetReportContext) -> Option<ExpositionResult> {
        let value = format_float(gauge.value().unwrap_or(f64::NAN));
        Some(self.result(gauge, ctx, ExpositionType::Gauge, vec![(String::new(), value)]))
    }

    fn report_histogram(
        &self,
        histogram: &MetricHandle,
        ctx: &MetricSetReportContext,
    ) -> Option<ExpositionResult> {
        let fields = Self::count_and_sum(histogram);
        Some(self.result(histogram, ctx, ExpositionType::Histogram, fields))
    }

    fn report_meter(&self, meter: &MetricHandle, ctx: &MetricSetReportContext) -> Option<ExpositionResult> {
        let value = meter.count().unwrap_or(0).to_string();
        Some(self.result(meter, ctx, ExpositionType::Gauge, vec![(String::new(), value)]))
    }

    fn report_timer(&self, timer: &MetricHandle, ctx: &MetricSetReportContext) -> Option<ExpositionResult> {
        let fields = Self::count_and_sum(timer);
        Some(self.result(timer, ctx, ExpositionType::Summary, fields))
    }

    async fn before_report(&self, ctx: &mut OverallReportContext) -> ReportResult<()> {
        ctx.result.clear();
        Ok(())
    }

    async fn handle_results(
        &self,
        ctx: &mut OverallReportContext,
        _registry_tags: &Tags,
        date: DateTime<Utc>,
        _kind: MetricKind,
        results: &[ReportingResult<ExpositionResult>],
    ) -> ReportResult<()> {
        for result in results {
            ctx.result.push_str(&self.render(date, &result.metric, &result.result));
        }
        Ok(())
    }
}

/// `group:name` with characters outside `[a-zA-Z0-9_:]` replaced by `_`
pub fn metric_name(metric: &MetricHandle) -> String {
    let raw = match metric.group() {
        Some(group) if !group.is_empty() => format!("{}:{}", group, metric.name()),
        _ => metric.name(),
    };
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.replace_range(..1, "_");
    }
    name
}

/// Label names reduced to `[a-zA-Z0-9_]`; reserved or invalid names dropped
pub fn normalize_tags(tags: &Tags) -> Tags {
    tags.iter()
        .filter_map(|(key, value)| {
            let normalized: String = key
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
                .collect();
            let valid = !normalized.is_empty()
                && !EXCLUDED_LABELS.contains(&normalized.as_str())
                && !normalized.starts_with(|c: char| c == '_' || c.is_ascii_digit());
            valid.then(|| (normalized, value.clone()))
        })
        .collect()
}

fn label_string(tags: &Tags) -> String {
    tags.iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, escape_label_value(value)))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_float(value: f64) -> String {
    if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

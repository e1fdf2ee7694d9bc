//! Tests for the line-protocol backend

use std::sync::Arc;

use parking_lot::Mutex;
use tally_core::prelude::*;
use tally_core::{
    Buckets, ManualClock, MetricHandle, MetricRef, MetricRegistry, SerializedMetric, SimpleGauge,
    Tags, Timer,
};

use super::sender::MockPointSender;
use super::*;
use crate::config::ReporterOptions;
use crate::error::ReportError;
use crate::reporter::{MetricCategory, ReportEngine};

const NOW_MS: u64 = 1_700_000_000_000;

fn ready_sender() -> MockPointSender {
    let mut sender = MockPointSender::new();
    sender.expect_is_ready().returning(|| true);
    sender
}

fn capturing_sender(sent: Arc<Mutex<Vec<MeasurementPoint>>>) -> MockPointSender {
    let mut sender = ready_sender();
    sender.expect_send().returning(move |points| {
        sent.lock().extend(points);
        Ok(())
    });
    sender
}

fn engine(sender: MockPointSender) -> ReportEngine<LineProtocolReporter> {
    let clock = Arc::new(ManualClock::at_millis(NOW_MS));
    ReportEngine::new(
        LineProtocolReporter::new(Arc::new(sender)),
        ReporterOptions::default().with_clock(clock),
    )
}

fn set_ctx(category: MetricCategory) -> MetricSetReportContext {
    MetricSetReportContext {
        registry: None,
        registry_tags: Tags::new(),
        reporter_tags: Tags::new(),
        date: DateTime::<Utc>::from_timestamp(1, 0).unwrap(),
        category,
        metrics: Vec::new(),
    }
}

#[tokio::test]
async fn test_grouped_and_ungrouped_naming() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let engine = engine(capturing_sender(sent.clone()));
    let registry = Arc::new(MetricRegistry::new());
    registry.new_counter("requests", Some("http")).increment(3);
    registry.new_counter("jobs", None).increment(2);
    engine.add_metric_registry(registry);

    engine.report().await;

    let sent = sent.lock();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].measurement, "http");
    assert_eq!(sent[0].fields.get("requests.count"), Some(&FieldValue::Integer(3)));
    assert_eq!(sent[1].measurement, "jobs");
    assert_eq!(sent[1].fields.get("count"), Some(&FieldValue::Integer(2)));
    assert_eq!(sent[1].timestamp.timestamp_millis(), NOW_MS as i64);
}

#[tokio::test]
async fn test_zero_values_are_skipped() {
    let mut sender = ready_sender();
    sender.expect_send().times(0);
    let engine = engine(sender);
    let registry = Arc::new(MetricRegistry::new());
    registry.new_counter("idle", None);
    registry.new_gauge("zero", None).set_value(0.0);
    registry.new_gauge("nan", None).set_value(f64::NAN);
    registry.new_timer("unused", None);
    engine.add_metric_registry(registry);

    engine.report().await;
}

#[tokio::test]
async fn test_timer_fields() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let engine = engine(capturing_sender(sent.clone()));
    let registry = Arc::new(MetricRegistry::new());
    let timer = registry.new_timer("query", Some("db"));
    timer.record(std::time::Duration::from_millis(5));
    engine.add_metric_registry(registry);

    engine.report().await;

    let sent = sent.lock();
    let names: Vec<&str> = sent[0].fields.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "query.count",
            "query.m15_rate",
            "query.m1_rate",
            "query.m5_rate",
            "query.max",
            "query.mean",
            "query.mean_rate",
            "query.min",
            "query.p50",
            "query.p75",
            "query.p95",
            "query.p98",
            "query.p99",
            "query.p999",
            "query.stddev",
        ]
    );
    assert_eq!(sent[0].fields.get("query.max"), Some(&FieldValue::Float(5_000_000.0)));
}

#[tokio::test]
async fn test_not_ready_sender_skips_cycle_and_rejects_events() {
    let mut sender = MockPointSender::new();
    sender.expect_is_ready().returning(|| false);
    sender.expect_send().times(0);
    let engine = engine(sender);
    let registry = Arc::new(MetricRegistry::new());
    registry.new_counter("jobs", None).increment(1);
    engine.add_metric_registry(registry);

    engine.report().await;
    let gauge = Arc::new(SimpleGauge::new("deploys"));
    gauge.set_value(1.0);
    let err = engine.report_event(gauge).await.unwrap_err();
    assert!(matches!(err, ReportError::NotReady { .. }));
}

#[tokio::test]
async fn test_report_event_propagates_send_failure() {
    let mut sender = ready_sender();
    sender
        .expect_send()
        .times(1)
        .returning(|_| Err(ReportError::transmission("connection refused")));
    let engine = engine(sender);
    let gauge = Arc::new(SimpleGauge::new("deploys"));
    gauge.set_value(1.0);

    let err = engine.report_event(gauge).await.unwrap_err();
    assert_eq!(err.error_code(), "REPORT_TRANSMISSION");
}

#[tokio::test]
async fn test_report_event_with_zero_value_is_invalid() {
    let mut sender = ready_sender();
    sender.expect_send().times(0);
    let engine = engine(sender);

    let err = engine
        .report_event(Arc::new(SimpleGauge::new("empty")))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "METRICS_INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_init_delegates_to_sender() {
    let mut sender = MockPointSender::new();
    sender.expect_init().times(1).returning(|| Ok(()));
    let reporter = LineProtocolReporter::new(Arc::new(sender));
    reporter.init().await.unwrap();
}

#[test]
fn test_live_and_serialized_produce_same_point() {
    let reporter = LineProtocolReporter::new(Arc::new(MockPointSender::new()));
    let timer = Arc::new(Timer::with_parts(
        "render",
        Arc::new(ManualClock::at_millis(NOW_MS)),
        Box::new(tally_core::metrics::SlidingWindowReservoir::new(16)),
        Buckets::empty(),
    ));
    timer.set_group("ui");
    timer.set_tag("page", "home");
    for millis in [3, 5, 8] {
        timer.record(std::time::Duration::from_millis(millis));
    }

    let live = MetricHandle::from(MetricRef::from(timer));
    let json = serde_json::to_string(&live.to_serialized()).unwrap();
    let serialized = MetricHandle::from(serde_json::from_str::<SerializedMetric>(&json).unwrap());
    let ctx = set_ctx(MetricCategory::Timer);

    assert_eq!(
        reporter.report_timer(&live, &ctx),
        reporter.report_timer(&serialized, &ctx)
    );
    assert!(reporter.report_timer(&live, &ctx).is_some());
}

//! Tests for the exposition backend

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tally_core::metrics::SlidingWindowReservoir;
use tally_core::prelude::*;
use tally_core::{Buckets, Event, ManualClock, MetricRegistry, Tags};

use super::*;
use crate::cluster::InMemoryCluster;
use crate::config::{ClusterOptions, ReporterOptions};

const NOW_MS: u64 = 1_700_000_000_000;

fn options() -> ReporterOptions {
    ReporterOptions::default().with_clock(Arc::new(ManualClock::at_millis(NOW_MS)))
}

fn reporter_with(format: ExpositionFormat) -> (ExpositionReporter, Arc<MetricRegistry>) {
    let reporter = ExpositionReporter::new(format, options());
    let registry = Arc::new(MetricRegistry::new());
    reporter.add_metric_registry(registry.clone());
    (reporter, registry)
}

#[tokio::test]
async fn test_monotone_counter_with_description() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default());
    let requests = registry.new_monotone_counter("requests", None);
    requests.set_description("Total requests");
    requests.increment(3).unwrap();

    let text = reporter.metrics_string().await;

    assert_eq!(
        text,
        "# HELP requests Total requests\n# TYPE requests counter\nrequests{} 3\n"
    );
}

#[tokio::test]
async fn test_signed_counter_is_a_gauge() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default());
    registry.new_counter("queue", Some("jobs")).increment(-2);

    let text = reporter.metrics_string().await;

    assert_eq!(
        text,
        "# HELP jobs:queue jobs:queue description\n# TYPE jobs:queue gauge\njobs:queue{} -2\n"
    );
}

#[tokio::test]
async fn test_histogram_buckets() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default());
    let sizes = registry.new_histogram_with(
        "sizes",
        None,
        Box::new(SlidingWindowReservoir::new(16)),
        Buckets::new(vec![1.0, 5.0]).unwrap(),
    );
    for value in [0.5, 3.0, 7.0] {
        sizes.update(value);
    }

    let text = reporter.metrics_string().await;

    assert_eq!(
        text,
        concat!(
            "# HELP sizes sizes description\n",
            "# TYPE sizes histogram\n",
            "sizes_bucket{le=\"1\"} 1\n",
            "sizes_bucket{le=\"5\"} 2\n",
            "sizes_bucket{le=\"+Inf\"} 3\n",
            "sizes_count{} 3\n",
            "sizes_sum{} 10\n",
        )
    );
}

#[tokio::test]
async fn test_timer_summary_with_custom_quantiles() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default().with_comments(false));
    let timer = registry.new_timer("query", None);
    Quantiles::new(vec![0.9, 0.5]).unwrap().attach(timer.as_ref());
    timer.record(Duration::from_millis(5));

    let text = reporter.metrics_string().await;

    assert_eq!(
        text,
        concat!(
            "query{quantile=\"0.5\"} 5000000\n",
            "query{quantile=\"0.9\"} 5000000\n",
            "query_count{} 1\n",
            "query_sum{} 5000000\n",
        )
    );
}

#[tokio::test]
async fn test_timer_uses_default_quantiles() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default());
    registry.new_timer("idle", None).record(Duration::from_millis(1));

    let text = reporter.metrics_string().await;

    assert!(text.contains("# TYPE idle summary\n"));
    assert_eq!(text.matches("idle{quantile=").count(), 9);
    assert!(text.contains("idle{quantile=\"0.999\"} 1000000\n"));
}

#[tokio::test]
async fn test_labels_are_normalized_and_filtered() {
    let reporter = ExpositionReporter::new(
        ExpositionFormat::default().with_comments(false),
        options().with_tag("app-name", "shop"),
    );
    let registry = Arc::new(MetricRegistry::new());
    reporter.add_metric_registry(registry.clone());
    let counter = registry.new_counter("jobs", None);
    counter.set_tag("le", "x");
    counter.set_tag("_hidden", "x");
    counter.set_tag("1st", "x");
    counter.set_tag("path", "say \"hi\"");
    counter.increment(2);

    let text = reporter.metrics_string().await;

    assert_eq!(text, "jobs{app_name=\"shop\",path=\"say \\\"hi\\\"\"} 2\n");
}

#[test]
fn test_normalize_tags() {
    let tags: Tags = [
        ("service.name", "api"),
        ("quantile", "0.5"),
        ("", "empty"),
        ("9lives", "cat"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let normalized = normalize_tags(&tags);

    assert_eq!(normalized.len(), 1);
    assert_eq!(normalized.get("service_name").map(String::as_str), Some("api"));
}

#[tokio::test]
async fn test_metric_names_are_sanitized() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default().with_comments(false));
    registry.new_counter("2xx", Some("http server")).increment(1);
    registry.new_counter("9lives", None).increment(1);

    let text = reporter.metrics_string().await;

    assert!(text.contains("http_server:2xx{} 1\n"));
    assert!(text.contains("_lives{} 1\n"));
}

#[tokio::test]
async fn test_untyped_and_timestamp() {
    let (reporter, registry) = reporter_with(
        ExpositionFormat::default()
            .with_untyped(true)
            .with_timestamp(true),
    );
    registry.new_meter("hits", None).mark(4);

    let text = reporter.metrics_string().await;

    assert_eq!(
        text,
        format!(
            "# HELP hits hits description\n# TYPE hits untyped\nhits{{}} 4 {}\n",
            NOW_MS
        )
    );
}

#[tokio::test]
async fn test_infinite_gauge() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default().with_comments(false));
    registry.new_gauge("ceiling", None).set_value(f64::INFINITY);

    let text = reporter.metrics_string().await;

    assert_eq!(text, "ceiling{} +Inf\n");
}

#[tokio::test]
async fn test_unchanged_metrics_are_suppressed_on_second_scrape() {
    let (reporter, registry) = reporter_with(ExpositionFormat::default().with_comments(false));
    registry.new_counter("jobs", None).increment(1);

    assert_eq!(reporter.metrics_string().await, "jobs{} 1\n");
    assert_eq!(reporter.metrics_string().await, "");
}

#[tokio::test]
async fn test_metrics_string_without_registries() {
    let reporter = ExpositionReporter::new(ExpositionFormat::default(), options());
    assert_eq!(reporter.metrics_string().await, "\n");
}

#[tokio::test]
async fn test_event_string() {
    let reporter = ExpositionReporter::new(ExpositionFormat::default(), options());
    let time = DateTime::<Utc>::from_timestamp(1_000, 0).unwrap();
    let event: Arc<dyn Gauge> = Arc::new(Event::at("deploy", time).with_value(2.0_f64));

    let text = reporter.event_string(event).await.unwrap();

    assert_eq!(
        text,
        "# HELP deploy deploy description\n# TYPE deploy gauge\ndeploy{} 2\n"
    );
}

#[test]
fn test_quantiles_out_of_range_are_rejected() {
    assert!(Quantiles::new(vec![0.5, 1.0]).is_err());
    assert!(Quantiles::new(vec![0.0]).is_err());
    assert_eq!(
        Quantiles::new(vec![0.9, 0.1]).unwrap().boundaries(),
        &[0.1, 0.9]
    );
}

#[tokio::test]
async fn test_start_outside_cluster() {
    let reporter = ExpositionReporter::new(ExpositionFormat::default(), options());
    assert!(!reporter.start());
}

#[tokio::test]
async fn test_master_includes_worker_text() {
    let cluster = InMemoryCluster::new();
    let master = ExpositionReporter::new(
        ExpositionFormat::default().with_comments(false),
        options().with_cluster(
            ClusterOptions::master(cluster.master_transport())
                .with_worker_response_timeout(Duration::from_secs(2)),
        ),
    );
    let worker = ExpositionReporter::new(
        ExpositionFormat::default().with_comments(false),
        options().with_cluster(ClusterOptions::worker(cluster.add_worker())),
    );

    let master_registry = Arc::new(MetricRegistry::new());
    master_registry.new_counter("master_jobs", None).increment(1);
    master.add_metric_registry(master_registry);
    let worker_registry = Arc::new(MetricRegistry::new());
    worker_registry.new_counter("worker_jobs", None).increment(2);
    worker.add_metric_registry(worker_registry);

    assert!(master.start());
    assert!(worker.start());
    assert!(!worker.start());

    let text = master.metrics_string().await;

    assert_eq!(text, "master_jobs{} 1\nworker_jobs{} 2\n");
    master.stop();
    worker.stop();
}

#[tokio::test]
async fn test_silent_worker_contributes_empty_text() {
    let cluster = InMemoryCluster::new();
    let master = ExpositionReporter::new(
        ExpositionFormat::default().with_comments(false),
        options().with_cluster(
            ClusterOptions::master(cluster.master_transport())
                .with_worker_response_timeout(Duration::from_millis(50)),
        ),
    );
    let _silent = cluster.add_worker();
    master.start();

    assert_eq!(master.metrics_string().await, "\n");
}

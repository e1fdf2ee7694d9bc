//! Messages exchanged between worker processes and the master

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::Tags;
use uuid::Uuid;

use crate::reporter::{OverallReportContext, SerializedResult};

/// Message type of a forwarded report cycle
pub const REPORT_MESSAGE_TYPE: &str = "tally:metric-reporter:report";
/// Message type of a master asking a worker for its exposition text
pub const SCRAPE_REQUEST_TYPE: &str = "tally:exposition:request-metrics";
/// Message type of a worker answering a scrape request
pub const SCRAPE_RESPONSE_TYPE: &str = "tally:exposition:response-metrics";

/// Backend results of one registry, grouped by category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedMetrics<T> {
    #[serde(default = "Vec::new")]
    pub monotone_counters: Vec<SerializedResult<T>>,
    #[serde(default = "Vec::new")]
    pub counters: Vec<SerializedResult<T>>,
    #[serde(default = "Vec::new")]
    pub gauges: Vec<SerializedResult<T>>,
    #[serde(default = "Vec::new")]
    pub histograms: Vec<SerializedResult<T>>,
    #[serde(default = "Vec::new")]
    pub meters: Vec<SerializedResult<T>>,
    #[serde(default = "Vec::new")]
    pub timers: Vec<SerializedResult<T>>,
}

impl<T> Default for ReportedMetrics<T> {
    fn default() -> Self {
        Self {
            monotone_counters: Vec::new(),
            counters: Vec::new(),
            gauges: Vec::new(),
            histograms: Vec::new(),
            meters: Vec::new(),
            timers: Vec::new(),
        }
    }
}

/// One registry's report cycle, sent from a worker to the master
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterprocessReportMessage<T> {
    pub target_reporter_type: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub ctx: OverallReportContext,
    pub date: DateTime<Utc>,
    pub tags: Tags,
    pub metrics: ReportedMetrics<T>,
}

impl<T> InterprocessReportMessage<T> {
    pub fn new(
        target_reporter_type: impl Into<String>,
        ctx: OverallReportContext,
        date: DateTime<Utc>,
        tags: Tags,
        metrics: ReportedMetrics<T>,
    ) -> Self {
        Self {
            target_reporter_type: target_reporter_type.into(),
            message_type: REPORT_MESSAGE_TYPE.to_string(),
            ctx,
            date,
            tags,
            metrics,
        }
    }
}

/// Master to worker: render your exposition text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub id: String,
    pub target_reporter_type: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

impl ScrapeRequest {
    /// New request with a fresh correlation id
    pub fn new(target_reporter_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target_reporter_type: target_reporter_type.into(),
            message_type: SCRAPE_REQUEST_TYPE.to_string(),
        }
    }

    pub fn respond(&self, metrics_str: impl Into<String>) -> ScrapeResponse {
        ScrapeResponse {
            id: self.id.clone(),
            target_reporter_type: self.target_reporter_type.clone(),
            message_type: SCRAPE_RESPONSE_TYPE.to_string(),
            metrics_str: metrics_str.into(),
        }
    }
}

/// Worker to master: exposition text for a [`ScrapeRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    pub id: String,
    pub target_reporter_type: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub metrics_str: String,
}

/// `type` field of a raw message, if any
pub fn message_type(payload: &Value) -> Option<&str> {
    payload.get("type").and_then(Value::as_str)
}

/// `targetReporterType` field of a raw message, if any
pub fn target_reporter_type(payload: &Value) -> Option<&str> {
    payload.get("targetReporterType").and_then(Value::as_str)
}

/// Whether `payload` has the given type and addresses `reporter_type`
pub fn is_addressed_to(payload: &Value, expected_type: &str, reporter_type: &str) -> bool {
    message_type(payload) == Some(expected_type)
        && target_reporter_type(payload) == Some(reporter_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scrape_request_wire_shape() {
        let request = ScrapeRequest::new("exposition");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], SCRAPE_REQUEST_TYPE);
        assert_eq!(value["targetReporterType"], "exposition");
        assert_eq!(value["id"].as_str().unwrap().len(), 36);

        let response = request.respond("a 1\n");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], SCRAPE_RESPONSE_TYPE);
        assert_eq!(value["metricsStr"], "a 1\n");
        assert_eq!(response.id, request.id);
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(ScrapeRequest::new("x").id, ScrapeRequest::new("x").id);
    }

    #[test]
    fn test_is_addressed_to() {
        let payload = json!({"type": REPORT_MESSAGE_TYPE, "targetReporterType": "logger"});
        assert!(is_addressed_to(&payload, REPORT_MESSAGE_TYPE, "logger"));
        assert!(!is_addressed_to(&payload, REPORT_MESSAGE_TYPE, "influx"));
        assert!(!is_addressed_to(&payload, SCRAPE_REQUEST_TYPE, "logger"));
        assert!(!is_addressed_to(&json!("text"), REPORT_MESSAGE_TYPE, "logger"));
    }

    #[test]
    fn test_report_message_defaults_missing_categories() {
        let payload = json!({
            "targetReporterType": "logger",
            "type": REPORT_MESSAGE_TYPE,
            "ctx": {},
            "date": "2024-01-01T00:00:00Z",
            "tags": {"host": "a"},
            "metrics": {"counters": [{"metric": {"name": "hits", "count": 3}, "result": 3}]}
        });
        let message: InterprocessReportMessage<i64> = serde_json::from_value(payload).unwrap();
        assert_eq!(message.metrics.counters.len(), 1);
        assert!(message.metrics.timers.is_empty());
        assert_eq!(message.metrics.counters[0].metric.count, Some(3));
    }
}

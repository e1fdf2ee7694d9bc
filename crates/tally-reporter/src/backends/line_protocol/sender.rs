//! Transmission of measurement points

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::point::MeasurementPoint;
use crate::error::{ReportError, ReportResult};

/// Destination of line-protocol points
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointSender: Send + Sync {
    /// Prepare the destination; called once before scheduled reporting
    async fn init(&self) -> ReportResult<()>;

    async fn is_ready(&self) -> bool;

    async fn send(&self, points: Vec<MeasurementPoint>) -> ReportResult<()>;
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts newline-separated points to an HTTP write endpoint
pub struct HttpPointSender {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    ready: AtomicBool,
}

impl HttpPointSender {
    /// Sender for a full write URL, e.g. `http://localhost:8086/write?db=metrics`
    pub fn new(url: impl Into<String>) -> ReportResult<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> ReportResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token: None,
            ready: AtomicBool::new(false),
        })
    }

    /// Send `Authorization: Token <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for HttpPointSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPointSender")
            .field("url", &self.url)
            .field("ready", &self.ready.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl PointSender for HttpPointSender {
    async fn init(&self) -> ReportResult<()> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ReportError::config_for(
                "url",
                format!("unsupported write url '{}'", self.url),
            ));
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send(&self, points: Vec<MeasurementPoint>) -> ReportResult<()> {
        let body = points
            .iter()
            .map(MeasurementPoint::to_line)
            .collect::<Vec<_>>()
            .join("\n");

        let mut request = self.client.post(&self.url).body(body);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {}", token));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::transmission_status(
                format!("write rejected with status {}", status),
                status.as_u16(),
                text,
            ));
        }
        debug!(url = %self.url, points = points.len(), "Wrote points");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_sender_ready_after_init() {
        let sender = HttpPointSender::new("http://localhost:8086/write?db=test").unwrap();
        assert!(!sender.is_ready().await);
        sender.init().await.unwrap();
        assert!(sender.is_ready().await);
    }

    #[tokio::test]
    async fn test_http_sender_rejects_unknown_scheme() {
        let sender = HttpPointSender::new("udp://localhost:8089").unwrap();
        let err = sender.init().await.unwrap_err();
        assert_eq!(err.error_code(), "REPORT_CONFIG");
        assert!(!sender.is_ready().await);
    }
}

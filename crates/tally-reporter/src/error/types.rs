//! Core error type for reporters

use tally_core::MetricsError;
use thiserror::Error;

/// Result type alias for reporter operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Errors raised while reporting metrics
#[derive(Error, Debug, Clone)]
pub enum ReportError {
    /// A backend could not transmit a batch
    #[error("Transmission error: {message}")]
    Transmission {
        message: String,
        status_code: Option<u16>,
        context: Option<String>,
    },

    /// The backend sender has not finished initialising
    #[error("Not ready: {message}")]
    NotReady { message: String },

    /// An inter-process channel rejected a message
    #[error("Channel error: {message}")]
    Channel { message: String },

    /// A message or result could not be (de)serialized
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Invalid reporter configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        field: Option<String>,
    },

    /// A metric rejected an operation
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl ReportError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &str {
        match self {
            ReportError::Transmission { .. } => "REPORT_TRANSMISSION",
            ReportError::NotReady { .. } => "REPORT_NOT_READY",
            ReportError::Channel { .. } => "REPORT_CHANNEL",
            ReportError::Serialization { .. } => "REPORT_SERIALIZATION",
            ReportError::Config { .. } => "REPORT_CONFIG",
            ReportError::Metrics(e) => e.error_code(),
        }
    }

    /// Whether the same call may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReportError::Transmission { .. } | ReportError::NotReady { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ReportError::transmission("x").error_code(),
            "REPORT_TRANSMISSION"
        );
        assert_eq!(ReportError::not_ready("x").error_code(), "REPORT_NOT_READY");
        assert_eq!(ReportError::config("x").error_code(), "REPORT_CONFIG");
        assert_eq!(
            ReportError::from(MetricsError::invalid_argument("x")).error_code(),
            "METRICS_INVALID_ARGUMENT"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ReportError::transmission("timeout").is_retryable());
        assert!(ReportError::not_ready("init").is_retryable());
        assert!(!ReportError::channel("closed").is_retryable());
        assert!(!ReportError::serialization("bad").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = ReportError::config_for("unit", "unknown time unit: fortnight");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown time unit: fortnight"
        );
    }
}

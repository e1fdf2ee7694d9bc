//! Core error type for metric primitives

use thiserror::Error;

/// Result type alias for metric operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised while building or mutating metrics
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// An argument violated the contract of the operation
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        field: Option<String>,
    },

    /// Bucket boundaries could not be built
    #[error("Invalid buckets: {message}")]
    InvalidBuckets { message: String },
}

impl MetricsError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &str {
        match self {
            MetricsError::InvalidArgument { .. } => "METRICS_INVALID_ARGUMENT",
            MetricsError::InvalidBuckets { .. } => "METRICS_INVALID_BUCKETS",
        }
    }

    /// Human readable message without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            MetricsError::InvalidArgument { message, .. }
            | MetricsError::InvalidBuckets { message } => message,
        }
    }
}

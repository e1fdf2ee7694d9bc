//! Constructor methods for MetricsError

use super::types::MetricsError;

impl MetricsError {
    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid argument error naming the offending field
    pub fn invalid_argument_for(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new invalid buckets error
    pub fn invalid_buckets(message: impl Into<String>) -> Self {
        Self::InvalidBuckets {
            message: message.into(),
        }
    }
}

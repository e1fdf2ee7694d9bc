//! Constructor methods for ReportError

use super::types::ReportError;

impl ReportError {
    /// Create a new transmission error
    pub fn transmission(message: impl Into<String>) -> Self {
        Self::Transmission {
            message: message.into(),
            status_code: None,
            context: None,
        }
    }

    /// Create a transmission error for a rejected response
    pub fn transmission_status(
        message: impl Into<String>,
        status_code: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Transmission {
            message: message.into(),
            status_code: Some(status_code),
            context: Some(body.into()),
        }
    }

    /// Create a new not-ready error
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    /// Create a new channel error
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error naming the offending field
    pub fn config_for(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

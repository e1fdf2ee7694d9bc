//! From trait implementations for ReportError conversions

use super::types::ReportError;

impl From<serde_json::Error> for ReportError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string())
    }
}

impl From<toml::de::Error> for ReportError {
    fn from(error: toml::de::Error) -> Self {
        Self::config(error.to_string())
    }
}

impl From<std::io::Error> for ReportError {
    fn from(error: std::io::Error) -> Self {
        Self::config(format!("cannot read configuration: {}", error))
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        let context = error.url().map(|u| u.to_string());
        Self::Transmission {
            message: error.to_string(),
            status_code,
            context,
        }
    }
}

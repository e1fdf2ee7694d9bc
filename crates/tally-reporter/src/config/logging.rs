//! Logging configuration and subscriber installation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{ReportError, ReportResult};

/// Output format of the fmt subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ReportError::config_for(
                "logging.format",
                format!("unknown log format '{}' (expected pretty, compact or json)", other),
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full `EnvFilter` string)
    pub level: String,
    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn log_format(&self) -> ReportResult<LogFormat> {
        self.format.parse()
    }

    pub fn env_filter(&self) -> ReportResult<EnvFilter> {
        EnvFilter::try_new(&self.level).map_err(|e| {
            ReportError::config_for(
                "logging.level",
                format!("invalid log level '{}': {}", self.level, e),
            )
        })
    }
}

/// Install a process-wide fmt subscriber
///
/// Returns `Ok(false)` when a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> ReportResult<bool> {
    let format = config.log_format()?;
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match format {
        LogFormat::Pretty => builder.pretty().try_init().is_ok(),
        LogFormat::Compact => builder.compact().try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.log_format().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "xml".to_string(),
        };
        let err = init_logging(&config).unwrap_err();
        assert_eq!(err.error_code(), "REPORT_CONFIG");
    }

    #[test]
    fn test_invalid_level_rejected() {
        let config = LoggingConfig {
            level: "tally=notalevel".to_string(),
            format: "compact".to_string(),
        };
        assert!(config.env_filter().is_err());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            format: "compact".to_string(),
        };
        init_logging(&config).unwrap();
        assert!(!init_logging(&config).unwrap());
    }
}

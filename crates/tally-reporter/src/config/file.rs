//! File form of the reporter configuration

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::{Clock, Tags, TimeUnit};

use super::logging::LoggingConfig;
use super::options::{
    ClusterOptions, ReporterOptions, ScheduleOptions, DEFAULT_WORKER_RESPONSE_TIMEOUT,
};
use crate::error::{ReportError, ReportResult};

/// Role of this process in the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    #[default]
    Disabled,
    Worker,
    Master,
}

/// `[cluster]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub role: ClusterRole,
    #[serde(with = "humantime_serde")]
    pub worker_response_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            role: ClusterRole::Disabled,
            worker_response_timeout: DEFAULT_WORKER_RESPONSE_TIMEOUT,
        }
    }
}

/// Reporter configuration as read from a TOML file
///
/// ```toml
/// report_interval = 10
/// unit = "second"
/// min_reporting_timeout = 5
/// reporter_type = "line-protocol"
///
/// [tags]
/// host = "web-1"
///
/// [cluster]
/// role = "master"
/// worker_response_timeout = "750ms"
///
/// [logging]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub report_interval: u64,
    /// Lower-case unit name of `report_interval`
    pub unit: String,
    /// Minutes
    pub min_reporting_timeout: u64,
    pub tags: Tags,
    pub reporter_type: Option<String>,
    pub cluster: ClusterConfig,
    pub logging: LoggingConfig,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            report_interval: 1000,
            unit: TimeUnit::Millisecond.as_str().to_string(),
            min_reporting_timeout: 1,
            tags: Tags::new(),
            reporter_type: None,
            cluster: ClusterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ReporterConfig {
    pub fn from_toml_str(content: &str) -> ReportResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML file; a missing file yields the defaults
    pub fn from_file(path: impl AsRef<Path>) -> ReportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn time_unit(&self) -> ReportResult<TimeUnit> {
        self.unit
            .parse()
            .map_err(|_| ReportError::config_for("unit", format!("unknown time unit '{}'", self.unit)))
    }

    /// Runtime options for this configuration
    ///
    /// A worker or master role still needs a transport attached with
    /// [`ClusterOptions::with_transport`] before it takes effect.
    pub fn into_options(self) -> ReportResult<(ReporterOptions, ScheduleOptions)> {
        let unit = self.time_unit()?;
        let cluster = ClusterOptions {
            enabled: self.cluster.role != ClusterRole::Disabled,
            send_metrics_to_master: self.cluster.role == ClusterRole::Worker,
            transport: None,
            worker_response_timeout: self.cluster.worker_response_timeout,
        };
        let options = ReporterOptions {
            min_reporting_timeout: self.min_reporting_timeout,
            tags: self.tags,
            cluster,
            reporter_type: self.reporter_type,
            ..ReporterOptions::default()
        };
        Ok((options, ScheduleOptions::new(self.report_interval, unit)))
    }

    /// Like [`into_options`](Self::into_options), with an explicit clock
    pub fn into_options_with_clock(
        self,
        clock: Arc<dyn Clock>,
    ) -> ReportResult<(ReporterOptions, ScheduleOptions)> {
        let (options, schedule) = self.into_options()?;
        Ok((options.with_clock(clock), schedule))
    }
}

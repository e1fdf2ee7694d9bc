//! Runtime reporter options

use std::sync::Arc;
use std::time::Duration;

use tally_core::{Clock, StdClock, Tags, TimeUnit};

use crate::cluster::ClusterTransport;

/// Default wait for a worker's scrape response
pub const DEFAULT_WORKER_RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Role of this process in a multi-process deployment
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Whether cluster coordination is active at all
    pub enabled: bool,
    /// Forward report cycles to the master instead of reporting directly
    pub send_metrics_to_master: bool,
    pub transport: Option<Arc<dyn ClusterTransport>>,
    /// How long the master waits for each worker during a scrape
    pub worker_response_timeout: Duration,
}

impl ClusterOptions {
    /// Single-process operation
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            send_metrics_to_master: false,
            transport: None,
            worker_response_timeout: DEFAULT_WORKER_RESPONSE_TIMEOUT,
        }
    }

    /// Worker that forwards its results to the master
    pub fn worker(transport: Arc<dyn ClusterTransport>) -> Self {
        Self {
            enabled: true,
            send_metrics_to_master: true,
            transport: Some(transport),
            worker_response_timeout: DEFAULT_WORKER_RESPONSE_TIMEOUT,
        }
    }

    /// Master that reports for itself and its workers
    pub fn master(transport: Arc<dyn ClusterTransport>) -> Self {
        Self {
            enabled: true,
            send_metrics_to_master: false,
            transport: Some(transport),
            worker_response_timeout: DEFAULT_WORKER_RESPONSE_TIMEOUT,
        }
    }

    /// Attach the endpoint used for cluster messages
    pub fn with_transport(mut self, transport: Arc<dyn ClusterTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_worker_response_timeout(mut self, timeout: Duration) -> Self {
        self.worker_response_timeout = timeout;
        self
    }

    /// Transport to use when acting as a worker
    pub fn worker_transport(&self) -> Option<&Arc<dyn ClusterTransport>> {
        if self.enabled && self.send_metrics_to_master {
            self.transport.as_ref()
        } else {
            None
        }
    }

    /// Transport to use when acting as the master
    pub fn master_transport(&self) -> Option<&Arc<dyn ClusterTransport>> {
        if self.enabled && !self.send_metrics_to_master {
            self.transport.as_ref()
        } else {
            None
        }
    }

    pub fn sends_to_master(&self) -> bool {
        self.worker_transport().is_some()
    }

    pub fn is_master(&self) -> bool {
        self.master_transport().is_some()
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Options shared by every reporter
#[derive(Debug, Clone)]
pub struct ReporterOptions {
    /// Source of report timestamps
    pub clock: Arc<dyn Clock>,
    /// Minutes after which an unchanged metric is reported again
    pub min_reporting_timeout: u64,
    /// Reporter-level tags, overridden by registry and metric tags
    pub tags: Tags,
    pub cluster: ClusterOptions,
    /// Name used to address this reporter in cluster messages
    pub reporter_type: Option<String>,
}

impl ReporterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_min_reporting_timeout(mut self, minutes: u64) -> Self {
        self.min_reporting_timeout = minutes;
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterOptions) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_reporter_type(mut self, reporter_type: impl Into<String>) -> Self {
        self.reporter_type = Some(reporter_type.into());
        self
    }

    /// Change-suppression window in milliseconds
    pub fn min_reporting_timeout_ms(&self) -> i64 {
        let millis = TimeUnit::Minute.convert_to(self.min_reporting_timeout as f64, TimeUnit::Millisecond);
        millis.min(i64::MAX as f64) as i64
    }
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            clock: Arc::new(StdClock::new()),
            min_reporting_timeout: 1,
            tags: Tags::new(),
            cluster: ClusterOptions::disabled(),
            reporter_type: None,
        }
    }
}

/// Report interval of a scheduled reporter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleOptions {
    pub report_interval: u64,
    pub unit: TimeUnit,
}

impl ScheduleOptions {
    pub fn new(report_interval: u64, unit: TimeUnit) -> Self {
        Self {
            report_interval,
            unit,
        }
    }

    pub fn interval(&self) -> Duration {
        self.unit.to_duration(self.report_interval)
    }
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self::new(1000, TimeUnit::Millisecond)
    }
}

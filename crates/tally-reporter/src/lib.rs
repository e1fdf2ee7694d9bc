//! Tally Reporter Library
//!
//! Drives [`tally_core`] registries into backends: change-suppressed report
//! cycles, interval scheduling, worker-to-master forwarding and scrape, and
//! the logger, line-protocol and exposition backends.

pub mod backends;
pub mod cluster;
pub mod config;
pub mod error;
pub mod reporter;

// Re-export commonly used types
pub use backends::{ExpositionFormat, ExpositionReporter, LineProtocolReporter, LoggerReporter};
pub use cluster::{ClusterTransport, InMemoryCluster};
pub use config::{init_logging, ClusterOptions, ReporterConfig, ReporterOptions, ScheduleOptions};
pub use error::{ReportError, ReportResult};
pub use reporter::{
    MetricKind, MetricReporter, MetricSetReportContext, OverallReportContext, ReportEngine,
    ReportingResult, ScheduledMetricReporter,
};

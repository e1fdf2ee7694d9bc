//! Reporter configuration
//!
//! Runtime options ([`ReporterOptions`], [`ScheduleOptions`],
//! [`ClusterOptions`]), their TOML file form ([`ReporterConfig`]) and
//! logging setup.

mod file;
mod logging;
mod options;

pub use file::{ClusterConfig, ClusterRole, ReporterConfig};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use options::{
    ClusterOptions, ReporterOptions, ScheduleOptions, DEFAULT_WORKER_RESPONSE_TIMEOUT,
};

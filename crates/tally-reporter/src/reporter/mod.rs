//! Reporting engine
//!
//! A backend implements [`MetricReporter`]; a [`ReportEngine`] walks the
//! attached registries and feeds it; a [`ScheduledMetricReporter`] runs
//! the engine on a timer.

mod engine;
mod scheduled;
mod traits;
mod types;


pub use engine::ReportEngine;
pub use scheduled::ScheduledMetricReporter;
pub use traits::MetricReporter;
pub use types::{
    build_tags, get_number, MetricCategory, MetricKind, MetricSetReportContext,
    OverallReportContext, ReportingResult, SerializedResult,
};

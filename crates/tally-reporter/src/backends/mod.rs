//! Reporter backends
//!
//! - [`logger`]: one structured log line per metric
//! - [`line_protocol`]: measurement points pushed over HTTP
//! - [`exposition`]: pull-based text exposition with cluster scrape

pub mod exposition;
pub mod line_protocol;
pub mod logger;

pub use exposition::{ExpositionFormat, ExpositionReporter};
pub use line_protocol::{HttpPointSender, LineProtocolReporter, MeasurementPoint, PointSender};
pub use logger::{LogLine, LogMetadata, LogSink, LoggerReporter};

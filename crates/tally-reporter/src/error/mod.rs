//! Error types for reporters
//!
//! Transmission failures are logged by the report cycle and never abort it;
//! readiness, configuration and serialization failures are returned to the
//! caller.

mod constructors;
mod conversions;
mod types;

pub use types::{ReportError, ReportResult};

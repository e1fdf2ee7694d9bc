//! Error types for metric primitives and registries
//!
//! Construction-time validation failures (bad bucket boundaries, negative
//! increments on monotone counters, unusable sampler settings) surface as
//! [`MetricsError`]. They indicate programmer error and are never retried.

mod constructors;
mod types;

pub use types::{MetricsError, MetricsResult};

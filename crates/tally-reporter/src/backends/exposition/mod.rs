//! Pull-based text exposition
//!
//! [`ExpositionFormat`] renders metrics in the text exposition format;
//! [`ExpositionReporter`] serves that text on demand and, in a cluster,
//! gathers the text of every worker.

mod format;
mod reporter;

#[cfg(test)]
mod tests;

pub use format::{
    metric_name, normalize_tags, ExpositionFormat, ExpositionResult, ExpositionType, Quantiles,
    QUANTILES_METADATA,
};
pub use reporter::ExpositionReporter;

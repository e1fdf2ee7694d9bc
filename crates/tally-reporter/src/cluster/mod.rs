//! Multi-process coordination
//!
//! Workers forward report cycles to the master (push) and answer scrape
//! requests from it (pull). Both directions travel as JSON payloads over a
//! [`ClusterTransport`].

mod memory;
mod message;
mod scrape;
mod transport;

pub use memory::{InMemoryCluster, InMemoryTransport};
pub use message::{
    is_addressed_to, message_type, target_reporter_type, InterprocessReportMessage,
    ReportedMetrics, ScrapeRequest, ScrapeResponse, REPORT_MESSAGE_TYPE, SCRAPE_REQUEST_TYPE,
    SCRAPE_RESPONSE_TYPE,
};
pub use scrape::ScrapeCoordinator;
pub use transport::{ClusterMessage, ClusterTransport, WorkerId};

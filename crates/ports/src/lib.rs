//! # nozzle-ports
//!
//! Port traits for the metrics nozzle.
//!
//! These are the seams between the envelope-to-metric core and everything it
//! treats as an external collaborator: application metadata lookup, unit
//! normalization, the outgoing metric sink, the batch poster used by
//! heartbeats, and structured logging. This crate depends only on `domain`
//! and `shared`.
//!
//! Every port is `Send + Sync`: the ingestion path may run on many caller
//! threads at once.

pub mod app_info;
pub mod heartbeat;
pub mod logger;
pub mod metrics;
pub mod units;

pub use app_info::*;
pub use heartbeat::*;
pub use logger::*;
pub use metrics::*;
pub use units::*;

// Re-export domain types used in port signatures, so adapter crates can
// implement ports without directly depending on `nozzle-domain`.
pub use nozzle_domain::{AppInfo, LabelSet, Metric};

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

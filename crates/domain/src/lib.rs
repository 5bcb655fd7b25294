//! # nozzle-domain
//!
//! Domain model for the envelope-to-metric pipeline:
//!
//! - **Envelope** - one bus event; the payload variant is the event type
//! - **Metric** - normalized, labeled measurement plus `LabelSet`
//! - **AppInfo** - organizational metadata for an application id
//!
//! ## Dependency Rules
//!
//! - Depends only on the `shared` crate
//! - No I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use nozzle_shared::shared_crate_version;

pub mod app_info;
pub mod envelope;
pub mod metric;

pub use app_info::AppInfo;
pub use envelope::{
    ContainerMetric, CounterEvent, Envelope, ErrorEvent, Event, EventType, HttpStartStop,
    LogMessage, UuidHalves, ValueMetric,
};
pub use metric::{LabelSet, Metric, event_time_from_nanos};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

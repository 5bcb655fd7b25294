//! # nozzle-app
//!
//! The envelope-to-metric pipeline:
//!
//! - [`LabelMaker`] derives the label set for one envelope
//! - [`EnvelopeMetricMapper`] turns an envelope into metrics and posts them
//! - [`HeartbeatAggregator`] counts internal events and flushes them as a batch
//!
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod heartbeat;
pub mod labels;
pub mod metric_mapper;

pub use heartbeat::{HeartbeatAggregator, NozzleIdentity};
pub use labels::LabelMaker;
pub use metric_mapper::{EnvelopeMetricMapper, MetricMapperError};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

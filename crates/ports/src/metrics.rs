//! Outgoing metric boundaries.

use nozzle_domain::Metric;
use nozzle_shared::Result;

/// Accepts metrics one at a time for buffering and eventual delivery.
///
/// Implementations buffer or hand off; delivery errors are theirs to handle.
pub trait MetricSinkPort: Send + Sync {
    /// Accept a single metric.
    fn post_metric(&self, metric: Metric);
}

/// Posts a batch of metrics in one call.
pub trait MetricPosterPort: Send + Sync {
    /// Post `batch` (may be empty).
    fn post_metrics(&self, batch: Vec<Metric>) -> Result<()>;
}

//! In-memory metric recorder.

use nozzle_domain::Metric;
use nozzle_ports::{MetricPosterPort, MetricSinkPort};
use nozzle_shared::{ErrorEnvelope, Result};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct RecorderState {
    metrics: Vec<Metric>,
    batches: Vec<Vec<Metric>>,
    failure: Option<ErrorEnvelope>,
}

/// Records every metric and batch it receives.
///
/// `post_metrics` can be made to fail with [`MetricRecorder::set_failure`];
/// failed batches are not recorded.
#[derive(Debug, Default)]
pub struct MetricRecorder {
    state: Mutex<RecorderState>,
}

impl MetricRecorder {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder whose batch posts fail with `error`.
    #[must_use]
    pub fn failing(error: ErrorEnvelope) -> Self {
        let recorder = Self::new();
        recorder.set_failure(Some(error));
        recorder
    }

    /// Make subsequent batch posts fail (`Some`) or succeed (`None`).
    pub fn set_failure(&self, failure: Option<ErrorEnvelope>) {
        self.lock().failure = failure;
    }

    /// Metrics received through `post_metric`.
    pub fn metrics(&self) -> Vec<Metric> {
        self.lock().metrics.clone()
    }

    /// Batches accepted through `post_metrics`.
    pub fn batches(&self) -> Vec<Vec<Metric>> {
        self.lock().batches.clone()
    }

    /// Drain single metrics.
    pub fn take_metrics(&self) -> Vec<Metric> {
        std::mem::take(&mut self.lock().metrics)
    }

    /// Drain batches.
    pub fn take_batches(&self) -> Vec<Vec<Metric>> {
        std::mem::take(&mut self.lock().batches)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricSinkPort for MetricRecorder {
    fn post_metric(&self, metric: Metric) {
        self.lock().metrics.push(metric);
    }
}

impl MetricPosterPort for MetricRecorder {
    fn post_metrics(&self, batch: Vec<Metric>) -> Result<()> {
        let mut state = self.lock();
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        state.batches.push(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nozzle_domain::{LabelSet, event_time_from_nanos};
    use nozzle_shared::{ErrorClass, ErrorCode};

    fn metric(name: &str) -> Metric {
        Metric::new(name, 1.0, LabelSet::new(), event_time_from_nanos(0))
    }

    #[test]
    fn records_metrics_and_batches_separately() {
        let recorder = MetricRecorder::new();
        recorder.post_metric(metric("a"));
        assert!(recorder.post_metrics(vec![metric("b"), metric("c")]).is_ok());

        assert_eq!(recorder.take_metrics().len(), 1);
        assert_eq!(recorder.batches().first().map(Vec::len), Some(2));
        assert_eq!(recorder.take_batches().len(), 1);
        assert!(recorder.batches().is_empty());
    }

    #[test]
    fn failing_recorder_rejects_batches_until_cleared() {
        let error = ErrorEnvelope::unexpected(
            ErrorCode::unavailable(),
            "backend down",
            ErrorClass::Retriable,
        );
        let recorder = MetricRecorder::failing(error.clone());
        assert_eq!(recorder.post_metrics(vec![metric("a")]), Err(error));
        assert!(recorder.batches().is_empty());

        recorder.set_failure(None);
        assert!(recorder.post_metrics(vec![metric("a")]).is_ok());
        assert_eq!(recorder.batches().len(), 1);
    }
}

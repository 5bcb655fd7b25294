//! Envelope-to-metric mapping.

use crate::labels::LabelMaker;
use nozzle_domain::{Envelope, Event, EventType, LabelSet, Metric, event_time_from_nanos};
use nozzle_ports::{LoggerPort, MetricSinkPort, UnitNormalizerPort, log_fields};
use nozzle_shared::{ErrorCode, ErrorEnvelope};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// Failure to map an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MetricMapperError {
    /// The event type has no metric mapping.
    #[error("unknown event type: {0}")]
    UnrecognizedEventType(EventType),
}

impl MetricMapperError {
    /// Stable error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnrecognizedEventType(_) => ErrorCode::new("mapper", "unrecognized_event_type"),
        }
    }
}

impl From<MetricMapperError> for ErrorEnvelope {
    fn from(error: MetricMapperError) -> Self {
        match error {
            MetricMapperError::UnrecognizedEventType(event_type) => {
                Self::expected(error.error_code(), error.to_string())
                    .with_metadata("eventType", event_type.as_str())
            },
        }
    }
}

/// Converts envelopes into metrics and posts them to a sink one by one.
///
/// `ValueMetric`, `ContainerMetric`, and `CounterEvent` map to one, six, and
/// two metrics respectively. Every other type is rejected without posting.
#[derive(Clone)]
pub struct EnvelopeMetricMapper {
    labels: LabelMaker,
    units: Arc<dyn UnitNormalizerPort>,
    sink: Arc<dyn MetricSinkPort>,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl EnvelopeMetricMapper {
    /// Mapper posting to `sink`.
    #[must_use]
    pub fn new(
        labels: LabelMaker,
        units: Arc<dyn UnitNormalizerPort>,
        sink: Arc<dyn MetricSinkPort>,
    ) -> Self {
        Self {
            labels,
            units,
            sink,
            logger: None,
        }
    }

    /// Log rejected envelopes at debug level.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Map `envelope` and post the resulting metrics in order.
    pub fn receive(&self, envelope: &Envelope) -> Result<(), MetricMapperError> {
        let metrics = match self.map(envelope) {
            Ok(metrics) => metrics,
            Err(error) => {
                if let Some(logger) = self.logger.as_ref() {
                    logger.debug(
                        "nozzle.mapper.unrecognized",
                        "Envelope type has no metric mapping",
                        Some(log_fields([("eventType", envelope.event_type().as_str())])),
                    );
                }
                return Err(error);
            },
        };

        for metric in metrics {
            self.sink.post_metric(metric);
        }
        Ok(())
    }

    fn map(&self, envelope: &Envelope) -> Result<Vec<Metric>, MetricMapperError> {
        let metrics = match &envelope.event {
            Event::ValueMetric(value) => {
                let at = event_time_from_nanos(envelope.timestamp);
                let metric = Metric::new(
                    value.name.clone(),
                    value.value,
                    self.labels.build(envelope),
                    at,
                );
                let unit = self.units.parse(&value.unit);
                if unit.is_empty() {
                    vec![metric]
                } else {
                    vec![metric.with_unit(unit)]
                }
            },
            Event::ContainerMetric(container) => {
                let labels = self.labels.build(envelope);
                let at = event_time_from_nanos(envelope.timestamp);
                [
                    ("diskBytesQuota", as_f64(container.disk_bytes_quota)),
                    ("instanceIndex", f64::from(container.instance_index)),
                    ("cpuPercentage", container.cpu_percentage),
                    ("diskBytes", as_f64(container.disk_bytes)),
                    ("memoryBytes", as_f64(container.memory_bytes)),
                    ("memoryBytesQuota", as_f64(container.memory_bytes_quota)),
                ]
                .into_iter()
                .map(|(name, value)| Metric::new(name, value, labels.clone(), at))
                .collect()
            },
            Event::CounterEvent(counter) => {
                let labels = self.labels.build(envelope);
                let at = event_time_from_nanos(envelope.timestamp);
                vec![
                    counter_metric(&counter.name, "delta", counter.delta, labels.clone(), at),
                    counter_metric(&counter.name, "total", counter.total, labels, at),
                ]
            },
            Event::HttpStartStop(_) | Event::LogMessage(_) | Event::Error(_) => {
                return Err(MetricMapperError::UnrecognizedEventType(
                    envelope.event_type(),
                ));
            },
        };
        Ok(metrics)
    }
}

fn counter_metric(
    name: &str,
    suffix: &str,
    value: u64,
    labels: LabelSet,
    at: SystemTime,
) -> Metric {
    Metric::new(format!("{name}.{suffix}"), as_f64(value), labels, at)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "counters and byte sizes are reported as doubles downstream"
)]
const fn as_f64(value: u64) -> f64 {
    value as f64
}

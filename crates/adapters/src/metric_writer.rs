//! JSON-lines metric output.
//!
//! Each metric becomes one line:
//! `{"type":"metric","name":..,"value":..,"unit":..,"labels":{..},"eventTimeNanos":..}`.
//! Batches are written line by line in order.

use crate::line_sink::LineSink;
use nozzle_domain::{LabelSet, Metric};
use nozzle_ports::{MetricPosterPort, MetricSinkPort};
use nozzle_shared::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const SERIALIZE_FAILED_LINE: &str =
    "{\"type\":\"metric\",\"name\":\"nozzle.metric.serialize_failed\",\"value\":1}\n";

/// Writes metrics to a line sink as JSON.
#[derive(Clone)]
pub struct JsonLinesMetricWriter {
    sink: Arc<dyn LineSink>,
    written: Arc<AtomicU64>,
}

impl JsonLinesMetricWriter {
    /// Writer backed by `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self {
            sink,
            written: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of metric lines written so far (shared across clones).
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn write(&self, metric: &Metric) {
        self.sink.write_line(&metric_line(metric));
        self.written.fetch_add(1, Ordering::Relaxed);
    }
}

impl MetricSinkPort for JsonLinesMetricWriter {
    fn post_metric(&self, metric: Metric) {
        self.write(&metric);
    }
}

impl MetricPosterPort for JsonLinesMetricWriter {
    fn post_metrics(&self, batch: Vec<Metric>) -> Result<()> {
        for metric in &batch {
            self.write(metric);
        }
        Ok(())
    }
}

/// Render one metric as a newline-terminated JSON line.
#[must_use]
pub fn metric_line(metric: &Metric) -> String {
    let mut payload = Map::new();
    payload.insert("type".to_string(), Value::from("metric"));
    payload.insert("name".to_string(), Value::from(metric.name.as_str()));
    payload.insert("value".to_string(), Value::from(metric.value));
    if let Some(unit) = &metric.unit {
        payload.insert("unit".to_string(), Value::from(unit.as_str()));
    }
    payload.insert("labels".to_string(), labels_to_json(&metric.labels));
    payload.insert(
        "eventTimeNanos".to_string(),
        Value::from(metric.event_time_nanos()),
    );

    serde_json::to_string(&Value::Object(payload)).map_or_else(
        |_| SERIALIZE_FAILED_LINE.to_string(),
        |mut encoded| {
            encoded.push('\n');
            encoded
        },
    )
}

fn labels_to_json(labels: &LabelSet) -> Value {
    Value::Object(
        labels
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
            .collect(),
    )
}

//! JSON envelope decoding.
//!
//! Input is the sonde-style JSON rendering of a bus envelope: the shared
//! header fields plus exactly one payload object whose key is the event type
//! in camelCase.
//!
//! ```json
//! { "origin": "rep", "eventType": "ValueMetric", "timestamp": 1500000000000000000,
//!   "valueMetric": { "name": "numCPUS", "value": 4, "unit": "count" } }
//! ```

use nozzle_domain::{
    ContainerMetric, CounterEvent, Envelope, ErrorEvent, Event, EventType, HttpStartStop,
    LogMessage, UuidHalves, ValueMetric,
};
use nozzle_shared::{ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure to turn a JSON document into an [`Envelope`].
#[derive(Debug, Error)]
pub enum EnvelopeDecodeError {
    /// Not JSON, wrong field types, or an unknown event type.
    #[error("invalid envelope JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The payload named by `eventType` is absent.
    #[error("envelope of type {event_type} has no `{field}` payload")]
    MissingPayload {
        /// Declared event type.
        event_type: EventType,
        /// Expected payload key.
        field: &'static str,
    },
    /// A payload other than the declared one is present.
    #[error("envelope of type {event_type} carries an unexpected `{field}` payload")]
    UnexpectedPayload {
        /// Declared event type.
        event_type: EventType,
        /// Offending payload key.
        field: &'static str,
    },
}

impl EnvelopeDecodeError {
    /// Stable error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidJson(_) => ErrorCode::new("envelope", "invalid_json"),
            Self::MissingPayload { .. } => ErrorCode::new("envelope", "missing_payload"),
            Self::UnexpectedPayload { .. } => ErrorCode::new("envelope", "unexpected_payload"),
        }
    }
}

impl From<EnvelopeDecodeError> for ErrorEnvelope {
    fn from(error: EnvelopeDecodeError) -> Self {
        let code = error.error_code();
        let envelope = Self::expected(code, error.to_string());
        match error {
            EnvelopeDecodeError::InvalidJson(_) => envelope,
            EnvelopeDecodeError::MissingPayload { event_type, field }
            | EnvelopeDecodeError::UnexpectedPayload { event_type, field } => envelope
                .with_metadata("eventType", event_type.as_str())
                .with_metadata("field", field),
        }
    }
}

/// Decode one JSON envelope.
pub fn decode_envelope_json(input: &str) -> Result<Envelope, EnvelopeDecodeError> {
    let dto: EnvelopeDto = serde_json::from_str(input)?;
    dto.into_envelope()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDto {
    origin: Option<String>,
    event_type: EventType,
    #[serde(default)]
    timestamp: i64,
    deployment: Option<String>,
    job: Option<String>,
    index: Option<String>,
    ip: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    http_start_stop: Option<HttpStartStopDto>,
    log_message: Option<LogMessageDto>,
    value_metric: Option<ValueMetricDto>,
    counter_event: Option<CounterEventDto>,
    error: Option<ErrorDto>,
    container_metric: Option<ContainerMetricDto>,
}

impl EnvelopeDto {
    fn payload_keys(&self) -> [(EventType, &'static str, bool); 6] {
        [
            (
                EventType::HttpStartStop,
                "httpStartStop",
                self.http_start_stop.is_some(),
            ),
            (EventType::LogMessage, "logMessage", self.log_message.is_some()),
            (
                EventType::ValueMetric,
                "valueMetric",
                self.value_metric.is_some(),
            ),
            (
                EventType::CounterEvent,
                "counterEvent",
                self.counter_event.is_some(),
            ),
            (EventType::Error, "error", self.error.is_some()),
            (
                EventType::ContainerMetric,
                "containerMetric",
                self.container_metric.is_some(),
            ),
        ]
    }

    fn into_envelope(self) -> Result<Envelope, EnvelopeDecodeError> {
        let event_type = self.event_type;
        if let Some((_, field, _)) = self
            .payload_keys()
            .into_iter()
            .find(|(kind, _, present)| *present && *kind != event_type)
        {
            return Err(EnvelopeDecodeError::UnexpectedPayload { event_type, field });
        }

        let missing = |field| EnvelopeDecodeError::MissingPayload { event_type, field };
        let event = match event_type {
            EventType::HttpStartStop => Event::HttpStartStop(
                self.http_start_stop
                    .ok_or_else(|| missing("httpStartStop"))?
                    .into(),
            ),
            EventType::LogMessage => {
                Event::LogMessage(self.log_message.ok_or_else(|| missing("logMessage"))?.into())
            },
            EventType::ValueMetric => Event::ValueMetric(
                self.value_metric
                    .ok_or_else(|| missing("valueMetric"))?
                    .into(),
            ),
            EventType::CounterEvent => Event::CounterEvent(
                self.counter_event
                    .ok_or_else(|| missing("counterEvent"))?
                    .into(),
            ),
            EventType::Error => Event::Error(self.error.ok_or_else(|| missing("error"))?.into()),
            EventType::ContainerMetric => Event::ContainerMetric(
                self.container_metric
                    .ok_or_else(|| missing("containerMetric"))?
                    .into(),
            ),
        };

        Ok(Envelope {
            origin: self.origin,
            timestamp: self.timestamp,
            deployment: self.deployment,
            job: self.job,
            index: self.index,
            ip: self.ip,
            tags: self.tags,
            event,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UuidDto {
    low: u64,
    high: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpStartStopDto {
    start_timestamp: Option<i64>,
    stop_timestamp: Option<i64>,
    method: Option<String>,
    uri: Option<String>,
    status_code: Option<i32>,
    application_id: Option<UuidDto>,
}

impl From<HttpStartStopDto> for HttpStartStop {
    fn from(dto: HttpStartStopDto) -> Self {
        Self {
            start_timestamp: dto.start_timestamp,
            stop_timestamp: dto.stop_timestamp,
            method: dto.method,
            uri: dto.uri,
            status_code: dto.status_code,
            application_id: dto.application_id.map(|id| UuidHalves::new(id.low, id.high)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogMessageDto {
    message: Option<String>,
    message_type: Option<String>,
    app_id: Option<String>,
    source_type: Option<String>,
    source_instance: Option<String>,
}

impl From<LogMessageDto> for LogMessage {
    fn from(dto: LogMessageDto) -> Self {
        Self {
            message: dto.message,
            message_type: dto.message_type,
            app_id: dto.app_id,
            source_type: dto.source_type,
            source_instance: dto.source_instance,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValueMetricDto {
    name: String,
    value: f64,
    unit: String,
}

impl From<ValueMetricDto> for ValueMetric {
    fn from(dto: ValueMetricDto) -> Self {
        Self {
            name: dto.name,
            value: dto.value,
            unit: dto.unit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CounterEventDto {
    name: String,
    delta: u64,
    total: u64,
}

impl From<CounterEventDto> for CounterEvent {
    fn from(dto: CounterEventDto) -> Self {
        Self {
            name: dto.name,
            delta: dto.delta,
            total: dto.total,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorDto {
    source: String,
    code: i32,
    message: String,
}

impl From<ErrorDto> for ErrorEvent {
    fn from(dto: ErrorDto) -> Self {
        Self {
            source: dto.source,
            code: dto.code,
            message: dto.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContainerMetricDto {
    application_id: Option<String>,
    instance_index: i32,
    cpu_percentage: f64,
    memory_bytes: u64,
    disk_bytes: u64,
    memory_bytes_quota: u64,
    disk_bytes_quota: u64,
}

impl From<ContainerMetricDto> for ContainerMetric {
    fn from(dto: ContainerMetricDto) -> Self {
        Self {
            application_id: dto.application_id,
            instance_index: dto.instance_index,
            cpu_percentage: dto.cpu_percentage,
            memory_bytes: dto.memory_bytes,
            disk_bytes: dto.disk_bytes,
            memory_bytes_quota: dto.memory_bytes_quota,
            disk_bytes_quota: dto.disk_bytes_quota,
        }
    }
}

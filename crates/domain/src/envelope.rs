//! Event-bus envelopes and their typed payloads.
//!
//! An envelope carries exactly one payload; the payload variant *is* the
//! event type, so there is no way to build an envelope whose tag and payload
//! disagree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Event type discriminant of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// HTTP request start/stop timing.
    HttpStartStop,
    /// Application or platform log line.
    LogMessage,
    /// Single named gauge-style value.
    ValueMetric,
    /// Monotonic counter with delta and total.
    CounterEvent,
    /// Platform error report.
    Error,
    /// Per-instance container resource usage.
    ContainerMetric,
}

impl EventType {
    /// Every event type, in wire declaration order.
    pub const ALL: [Self; 6] = [
        Self::HttpStartStop,
        Self::LogMessage,
        Self::ValueMetric,
        Self::CounterEvent,
        Self::Error,
        Self::ContainerMetric,
    ];

    /// Canonical string form (used for the `eventType` label).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpStartStop => "HttpStartStop",
            Self::LogMessage => "LogMessage",
            Self::ValueMetric => "ValueMetric",
            Self::CounterEvent => "CounterEvent",
            Self::Error => "Error",
            Self::ContainerMetric => "ContainerMetric",
        }
    }

    /// Parse the canonical string form (case-sensitive, surrounding whitespace ignored).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        Self::ALL.into_iter().find(|kind| kind.as_str() == trimmed)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// 128-bit identifier split into two little-endian halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UuidHalves {
    /// Low 64 bits (first eight bytes, little-endian).
    pub low: u64,
    /// High 64 bits (last eight bytes, little-endian).
    pub high: u64,
}

impl UuidHalves {
    /// Build from the two halves.
    #[must_use]
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    /// Hyphenated lowercase GUID string.
    #[must_use]
    pub fn to_guid_string(self) -> String {
        let value = (u128::from(self.high) << 64) | u128::from(self.low);
        Uuid::from_u128_le(value).hyphenated().to_string()
    }
}

impl fmt::Display for UuidHalves {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_guid_string())
    }
}

/// HTTP request timing payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpStartStop {
    /// Request start (ns since epoch).
    pub start_timestamp: Option<i64>,
    /// Request end (ns since epoch).
    pub stop_timestamp: Option<i64>,
    /// Request method.
    pub method: Option<String>,
    /// Request URI.
    pub uri: Option<String>,
    /// Response status code.
    pub status_code: Option<i32>,
    /// Owning application, when the request was routed to one.
    pub application_id: Option<UuidHalves>,
}

/// Log line payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMessage {
    /// Raw message bytes rendered as text.
    pub message: Option<String>,
    /// `OUT` or `ERR`.
    pub message_type: Option<String>,
    /// Owning application guid.
    pub app_id: Option<String>,
    /// Source component type (e.g. `APP/PROC/WEB`).
    pub source_type: Option<String>,
    /// Source instance.
    pub source_instance: Option<String>,
}

/// Single named value payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMetric {
    /// Metric name.
    pub name: String,
    /// Metric value.
    pub value: f64,
    /// Raw unit string as emitted by the source.
    pub unit: String,
}

/// Counter payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterEvent {
    /// Counter name.
    pub name: String,
    /// Increment since the previous event.
    pub delta: u64,
    /// Running total.
    pub total: u64,
}

/// Platform error payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Reporting component.
    pub source: String,
    /// Numeric error code.
    pub code: i32,
    /// Error text.
    pub message: String,
}

/// Container resource usage payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerMetric {
    /// Owning application guid.
    pub application_id: Option<String>,
    /// Application instance index.
    pub instance_index: i32,
    /// CPU usage in percent.
    pub cpu_percentage: f64,
    /// Memory usage in bytes.
    pub memory_bytes: u64,
    /// Disk usage in bytes.
    pub disk_bytes: u64,
    /// Memory quota in bytes.
    pub memory_bytes_quota: u64,
    /// Disk quota in bytes.
    pub disk_bytes_quota: u64,
}

/// Typed payload of an envelope. The variant determines the event type.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// HTTP timing.
    HttpStartStop(HttpStartStop),
    /// Log line.
    LogMessage(LogMessage),
    /// Named value.
    ValueMetric(ValueMetric),
    /// Counter.
    CounterEvent(CounterEvent),
    /// Platform error.
    Error(ErrorEvent),
    /// Container usage.
    ContainerMetric(ContainerMetric),
}

impl Event {
    /// Event type of this payload.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::HttpStartStop(_) => EventType::HttpStartStop,
            Self::LogMessage(_) => EventType::LogMessage,
            Self::ValueMetric(_) => EventType::ValueMetric,
            Self::CounterEvent(_) => EventType::CounterEvent,
            Self::Error(_) => EventType::Error,
            Self::ContainerMetric(_) => EventType::ContainerMetric,
        }
    }
}

/// One unit of telemetry received from the event bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Emitting component.
    pub origin: Option<String>,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Deployment name (never used as a label).
    pub deployment: Option<String>,
    /// Job name.
    pub job: Option<String>,
    /// Job instance index.
    pub index: Option<String>,
    /// Emitting VM address (never used as a label).
    pub ip: Option<String>,
    /// Free-form tags.
    pub tags: BTreeMap<String, String>,
    /// Typed payload.
    pub event: Event,
}

impl Envelope {
    /// Envelope with only a payload and timestamp set.
    #[must_use]
    pub const fn new(timestamp: i64, event: Event) -> Self {
        Self {
            origin: None,
            timestamp,
            deployment: None,
            job: None,
            index: None,
            ip: None,
            tags: BTreeMap::new(),
            event,
        }
    }

    /// Set the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the job.
    #[must_use]
    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Set the job index.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Set the deployment.
    #[must_use]
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    /// Set the IP address.
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Event type of the carried payload.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event.event_type()
    }
}

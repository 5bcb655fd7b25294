//! Normalized metric records handed to the outgoing sink.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Flat string labels attached to a metric.
pub type LabelSet = BTreeMap<String, String>;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A single labeled measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Metric name.
    pub name: String,
    /// Measured value.
    pub value: f64,
    /// Labels for downstream grouping.
    pub labels: LabelSet,
    /// Time the measurement refers to.
    pub event_time: SystemTime,
    /// Canonical unit, when one applies.
    pub unit: Option<String>,
}

impl Metric {
    /// Metric without a unit.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        labels: LabelSet,
        event_time: SystemTime,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            labels,
            event_time,
            unit: None,
        }
    }

    /// Attach a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Event time as nanoseconds since the Unix epoch (saturating).
    #[must_use]
    pub fn event_time_nanos(&self) -> i64 {
        match self.event_time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
            Err(before) => {
                i64::try_from(before.duration().as_nanos()).map_or(i64::MIN, |nanos| -nanos)
            },
        }
    }
}

/// Convert an envelope timestamp (ns since epoch) into a `SystemTime`.
///
/// Seconds and the nanosecond remainder are split with integer arithmetic so
/// no precision is lost; negative timestamps land before the epoch.
#[must_use]
pub fn event_time_from_nanos(timestamp: i64) -> SystemTime {
    let seconds = timestamp.div_euclid(NANOS_PER_SECOND);
    let nanos = timestamp.rem_euclid(NANOS_PER_SECOND);
    // rem_euclid keeps nanos in [0, 1e9).
    let nanos = u32::try_from(nanos).unwrap_or(0);
    if seconds >= 0 {
        UNIX_EPOCH + Duration::new(seconds.unsigned_abs(), nanos)
    } else {
        let before = UNIX_EPOCH - Duration::from_secs(seconds.unsigned_abs());
        before + Duration::from_nanos(u64::from(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_time_keeps_nanosecond_precision() {
        let timestamp = 1_500_000_000_123_456_789;
        let time = event_time_from_nanos(timestamp);
        let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        assert_eq!(since.as_secs(), 1_500_000_000);
        assert_eq!(since.subsec_nanos(), 123_456_789);
    }

    #[test]
    fn event_time_handles_pre_epoch_timestamps() {
        let time = event_time_from_nanos(-1_500_000_000);
        let metric = Metric::new("m", 1.0, LabelSet::new(), time);
        assert_eq!(metric.event_time_nanos(), -1_500_000_000);
    }

    #[test]
    fn metric_round_trips_event_time_nanos() {
        let metric = Metric::new("m", 1.0, LabelSet::new(), event_time_from_nanos(42));
        assert_eq!(metric.event_time_nanos(), 42);
        assert!(metric.unit.is_none());
        assert_eq!(metric.with_unit("By").unit.as_deref(), Some("By"));
    }
}

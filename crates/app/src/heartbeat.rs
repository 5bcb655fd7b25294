//! Self-monitoring heartbeat counters.
//!
//! The aggregator is the only shared mutable state in the pipeline. Its lock
//! is held for a single increment or a take-and-reset, never while posting.

use nozzle_domain::{LabelSet, Metric};
use nozzle_ports::{HeartbeatPort, LoggerPort, MetricPosterPort, log_fields};
use nozzle_shared::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Prefix of every heartbeat metric name.
pub const HEARTBEAT_METRIC_PREFIX: &str = "heartbeat.";
/// Label carrying the nozzle name.
pub const LABEL_INSTANCE: &str = "instance";
/// Label carrying the nozzle zone.
pub const LABEL_ZONE: &str = "zone";

const HANDLER_NAME: &str = "heartbeat.metric_handler";

/// Identity of the running nozzle instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NozzleIdentity {
    /// Unique id.
    pub id: String,
    /// Instance name (`instance` label).
    pub name: String,
    /// Zone (`zone` label).
    pub zone: String,
}

impl NozzleIdentity {
    /// Identity from its three parts.
    pub fn new(id: impl Into<String>, name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            zone: zone.into(),
        }
    }
}

/// Counts named internal events and periodically posts the counts.
pub struct HeartbeatAggregator {
    poster: Arc<dyn MetricPosterPort>,
    identity: NozzleIdentity,
    started_at: SystemTime,
    counter: Mutex<BTreeMap<String, u64>>,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl HeartbeatAggregator {
    /// Aggregator posting batches to `poster`.
    #[must_use]
    pub fn new(poster: Arc<dyn MetricPosterPort>, identity: NozzleIdentity) -> Self {
        Self {
            poster,
            identity,
            started_at: SystemTime::now(),
            counter: Mutex::new(BTreeMap::new()),
            logger: None,
        }
    }

    /// Log flush outcomes.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Handler identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        HANDLER_NAME
    }

    /// Identity the aggregator labels its metrics with.
    #[must_use]
    pub const fn identity(&self) -> &NozzleIdentity {
        &self.identity
    }

    /// Creation time.
    #[must_use]
    pub const fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Count one occurrence of `event`.
    pub fn handle(&self, event: &str) {
        let mut counter = self.lock();
        match counter.get_mut(event) {
            Some(count) => *count = count.saturating_add(1),
            None => {
                counter.insert(event.to_string(), 1);
            },
        }
    }

    /// Post the counts accumulated since the previous flush and reset them.
    ///
    /// The batch is posted even when empty. A failed post is returned as-is;
    /// its counts are not re-queued.
    pub fn flush(&self) -> Result<()> {
        let counts = std::mem::take(&mut *self.lock());
        let now = SystemTime::now();
        let batch: Vec<Metric> = counts
            .into_iter()
            .map(|(event, count)| {
                Metric::new(
                    format!("{HEARTBEAT_METRIC_PREFIX}{event}"),
                    count_as_f64(count),
                    self.labels(),
                    now,
                )
            })
            .collect();
        let size = batch.len();

        let result = self.poster.post_metrics(batch);
        if let Some(logger) = self.logger.as_ref() {
            match &result {
                Ok(()) => logger.debug(
                    "nozzle.heartbeat.flush",
                    "Heartbeat counts posted",
                    Some(log_fields([("metrics", Value::from(size))])),
                ),
                Err(error) => logger.warn(
                    "nozzle.heartbeat.flush_failed",
                    "Heartbeat post failed",
                    Some(log_fields([
                        ("metrics", Value::from(size)),
                        ("code", Value::from(error.code.to_string())),
                        ("message", Value::from(error.message.as_str())),
                    ])),
                ),
            }
        }
        result
    }

    fn labels(&self) -> LabelSet {
        LabelSet::from([
            (LABEL_INSTANCE.to_string(), self.identity.name.clone()),
            (LABEL_ZONE.to_string(), self.identity.zone.clone()),
        ])
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, u64>> {
        self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HeartbeatPort for HeartbeatAggregator {
    fn handle(&self, event: &str) {
        Self::handle(self, event);
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "heartbeat counts are reported as doubles downstream"
)]
const fn count_as_f64(count: u64) -> f64 {
    count as f64
}

//! `LoggerPort` adapter that forwards events to `tracing`.
//!
//! Fields and error payloads are redacted and rendered as JSON strings so any
//! subscriber (fmt, json, or a test collector) can display them.

use crate::logger::{redact_object, redact_value};
use nozzle_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use serde_json::{Map, Value};

/// Forwards structured log events to the active `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Logger with no base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());
        let mut object: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| (key.into_string(), value))
            .collect();
        redact_object(&mut object);
        let fields = Value::Object(object).to_string();

        let error = event.error.map_or_else(String::new, |mut error| {
            redact_value(&mut error);
            error.to_string()
        });

        let name = &*event.event;
        let message = &*event.message;
        match event.level {
            LogLevel::Debug => {
                tracing::debug!(event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Info => {
                tracing::info!(event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Warn => {
                tracing::warn!(event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Error => {
                tracing::error!(event = name, fields = %fields, error = %error, "{message}");
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nozzle_ports::log_fields;
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(run: impl FnOnce()) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, run);
        captured.text()
    }

    #[test]
    fn forwards_event_name_and_redacted_fields() {
        let output = capture(|| {
            let logger = TracingLogger::new().child(log_fields([("zone", "us-east1-b")]));
            logger.warn(
                "nozzle.heartbeat.flush_failed",
                "heartbeat post failed",
                Some(log_fields([("password", "hunter2")])),
            );
        });

        assert!(output.contains("WARN"));
        assert!(output.contains("nozzle.heartbeat.flush_failed"));
        assert!(output.contains("heartbeat post failed"));
        assert!(output.contains("us-east1-b"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn logging_without_a_subscriber_is_a_no_op() {
        let logger = TracingLogger::new();
        logger.debug("nozzle.envelope.log", "nobody listening", None);
    }
}

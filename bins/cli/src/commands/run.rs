//! Run command: stream JSON-lines envelopes through the pipeline.
//!
//! Metrics go to stdout as JSON lines; logs go to stderr. Heartbeat counts
//! are flushed every `heartbeatRateSecs` and once more at end of input.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{LogFormat, OutputMode};
use crate::format_error_output;
use nozzle_adapters::{
    InMemoryAppInfoDirectory, JsonLinesMetricWriter, JsonLogger, LineSink, NullAppInfoDirectory,
    StderrLineSink, StdoutLineSink, TracingLogger, UnitParser, decode_envelope_json,
};
use nozzle_app::{EnvelopeMetricMapper, HeartbeatAggregator, LabelMaker, NozzleIdentity};
use nozzle_config::{ValidatedNozzleConfig, load_config_std_env};
use nozzle_domain::{Envelope, Event};
use nozzle_ports::{AppInfoDirectoryPort, LogFields, LogLevel, LoggerPort, log_fields};
use nozzle_shared::{ErrorEnvelope, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing_subscriber::EnvFilter;

/// Heartbeat event counted for every decoded envelope.
pub const EVENT_RECEIVED: &str = "nozzle.events.received";
/// Heartbeat event counted when the mapper rejects an envelope.
pub const EVENT_UNRECOGNIZED: &str = "nozzle.metrics.unrecognized";
/// Heartbeat event counted for every undecodable input line.
pub const EVENT_DECODE_FAILED: &str = "nozzle.envelope.decode_failed";

/// Inputs of the `run` command.
#[derive(Debug, Clone)]
pub struct RunCommandInput {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub app_info: Option<PathBuf>,
    pub log_format: LogFormat,
}

/// Per-run totals, reported in `nozzle.run.completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub lines: u64,
    pub received: u64,
    pub decode_failed: u64,
    pub mapped: u64,
    pub unrecognized: u64,
    pub logged: u64,
    pub flushes: u64,
    pub flush_failures: u64,
}

impl RunStats {
    fn to_fields(self) -> LogFields {
        log_fields([
            ("lines", Value::from(self.lines)),
            ("received", Value::from(self.received)),
            ("decodeFailed", Value::from(self.decode_failed)),
            ("mapped", Value::from(self.mapped)),
            ("unrecognized", Value::from(self.unrecognized)),
            ("logged", Value::from(self.logged)),
            ("flushes", Value::from(self.flushes)),
            ("flushFailures", Value::from(self.flush_failures)),
        ])
    }
}

/// Run the pipeline until the input is exhausted.
pub fn run_nozzle(mode: OutputMode, input: &RunCommandInput) -> Result<CliOutput, CliError> {
    let config = match load_config_std_env(input.config.as_deref()) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let logger = build_logger(input.log_format, config.nozzle.debug);
    let app_info = match build_app_info(input.app_info.as_deref(), &config, logger.as_ref()) {
        Ok(app_info) => app_info,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let pipeline = Pipeline::new(
        config,
        app_info,
        Arc::new(StdoutLineSink),
        logger,
    );

    let stats = match runtime.block_on(pipeline.run_input(input.input.as_deref())) {
        Ok(stats) => stats,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::Io)),
    };

    let exit_code = if stats.flush_failures == 0 {
        ExitCode::Ok
    } else {
        ExitCode::Internal
    };
    Ok(CliOutput {
        stdout: String::new(),
        stderr: String::new(),
        exit_code,
    })
}

fn build_logger(format: LogFormat, debug: bool) -> Arc<dyn LoggerPort> {
    let level = if debug { LogLevel::Debug } else { LogLevel::Info };
    match format {
        LogFormat::Json => {
            Arc::new(JsonLogger::new(Arc::new(StderrLineSink)).with_min_level(level))
        },
        LogFormat::Tracing => {
            let default_directive = if debug { "debug" } else { "info" };
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive));
            // Keeps an already installed global subscriber.
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .ok();
            Arc::new(TracingLogger::new())
        },
    }
}

fn build_app_info(
    path: Option<&Path>,
    config: &ValidatedNozzleConfig,
    logger: &dyn LoggerPort,
) -> Result<Arc<dyn AppInfoDirectoryPort>> {
    match (config.nozzle.resolve_app_metadata, path) {
        (true, Some(path)) => Ok(Arc::new(InMemoryAppInfoDirectory::from_path(path)?)),
        (true, None) => {
            logger.warn(
                "nozzle.run.app_info_missing",
                "App metadata resolution enabled without an app-info source",
                None,
            );
            Ok(Arc::new(NullAppInfoDirectory))
        },
        (false, Some(path)) => {
            logger.info(
                "nozzle.run.app_info_ignored",
                "App metadata resolution disabled; ignoring app-info source",
                Some(log_fields([("path", path.display().to_string())])),
            );
            Ok(Arc::new(NullAppInfoDirectory))
        },
        (false, None) => Ok(Arc::new(NullAppInfoDirectory)),
    }
}

/// Wired pipeline for one run.
pub struct Pipeline {
    config: ValidatedNozzleConfig,
    mapper: EnvelopeMetricMapper,
    heartbeat: HeartbeatAggregator,
    logger: Arc<dyn LoggerPort>,
}

impl Pipeline {
    pub fn new(
        config: ValidatedNozzleConfig,
        app_info: Arc<dyn AppInfoDirectoryPort>,
        metrics_out: Arc<dyn LineSink>,
        logger: Arc<dyn LoggerPort>,
    ) -> Self {
        let writer = Arc::new(JsonLinesMetricWriter::new(metrics_out));
        let mapper = EnvelopeMetricMapper::new(
            LabelMaker::new(app_info),
            Arc::new(UnitParser::new()),
            writer.clone(),
        )
        .with_logger(Arc::clone(&logger));
        let identity = NozzleIdentity::new(
            &*config.nozzle.id,
            &*config.nozzle.name,
            &*config.nozzle.zone,
        );
        let heartbeat =
            HeartbeatAggregator::new(writer, identity).with_logger(Arc::clone(&logger));

        Self {
            config,
            mapper,
            heartbeat,
            logger,
        }
    }

    async fn run_input(&self, path: Option<&Path>) -> Result<RunStats> {
        match path {
            Some(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|error| {
                    ErrorEnvelope::from(error).with_metadata("path", path.display().to_string())
                })?;
                self.run(BufReader::new(file)).await
            },
            None => self.run(BufReader::new(tokio::io::stdin())).await,
        }
    }

    pub async fn run<R>(&self, reader: R) -> Result<RunStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = RunStats::default();
        let mut lines = reader.split(b'\n');
        let period = self.config.heartbeat_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.logger.info(
            "nozzle.run.start",
            "Nozzle started",
            Some(log_fields([
                ("nozzle", Value::from(&*self.config.nozzle.name)),
                ("zone", Value::from(&*self.config.nozzle.zone)),
                ("handler", Value::from(self.heartbeat.name())),
                (
                    "heartbeatRateSecs",
                    Value::from(self.config.nozzle.heartbeat_rate_secs),
                ),
            ])),
        );

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => self.flush(&mut stats),
                segment = lines.next_segment() => match segment {
                    Ok(Some(bytes)) => self.process_bytes(&bytes, &mut stats),
                    Ok(None) => break Ok(()),
                    Err(error) => break Err(ErrorEnvelope::from(error)),
                },
            }
        };

        self.flush(&mut stats);
        match outcome {
            Ok(()) => {
                self.logger.info(
                    "nozzle.run.completed",
                    "Nozzle input exhausted",
                    Some(stats.to_fields()),
                );
                Ok(stats)
            },
            Err(error) => {
                self.logger.error(
                    "nozzle.run.read_failed",
                    "Input stream failed; remaining heartbeat counts flushed",
                    Some(stats.to_fields()),
                );
                Err(error)
            },
        }
    }

    fn process_bytes(&self, bytes: &[u8], stats: &mut RunStats) {
        match std::str::from_utf8(bytes) {
            Ok(line) => self.process_line(line, stats),
            Err(error) => {
                stats.lines += 1;
                self.record_decode_failure(
                    stats,
                    "envelope:invalid_utf8",
                    &format!("input line is not valid UTF-8: {error}"),
                );
            },
        }
    }

    fn process_line(&self, line: &str, stats: &mut RunStats) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        stats.lines += 1;

        match decode_envelope_json(trimmed) {
            Ok(envelope) => {
                stats.received += 1;
                self.heartbeat.handle(EVENT_RECEIVED);
                self.dispatch(&envelope, stats);
            },
            Err(error) => {
                let error = ErrorEnvelope::from(error);
                self.record_decode_failure(stats, &error.code.to_string(), &error.message);
            },
        }
    }

    fn record_decode_failure(&self, stats: &mut RunStats, code: &str, message: &str) {
        stats.decode_failed += 1;
        self.heartbeat.handle(EVENT_DECODE_FAILED);
        self.logger.warn(
            "nozzle.envelope.decode_failed",
            "Skipping undecodable input line",
            Some(log_fields([
                ("line", Value::from(stats.lines)),
                ("code", Value::from(code)),
                ("message", Value::from(message)),
            ])),
        );
    }

    fn dispatch(&self, envelope: &Envelope, stats: &mut RunStats) {
        let kind = envelope.event_type();
        if self.config.forwards_to_monitoring(kind) {
            match self.mapper.receive(envelope) {
                Ok(()) => stats.mapped += 1,
                Err(_) => {
                    stats.unrecognized += 1;
                    self.heartbeat.handle(EVENT_UNRECOGNIZED);
                },
            }
        }
        if self.config.forwards_to_logging(kind) {
            stats.logged += 1;
            self.logger.info(
                "nozzle.envelope.log",
                "Envelope forwarded to logging",
                Some(envelope_log_fields(envelope)),
            );
        }
    }

    fn flush(&self, stats: &mut RunStats) {
        stats.flushes += 1;
        if self.heartbeat.flush().is_err() {
            stats.flush_failures += 1;
        }
    }
}

fn envelope_log_fields(envelope: &Envelope) -> LogFields {
    let mut fields = log_fields([("eventType", envelope.event_type().as_str())]);
    put_str(&mut fields, "origin", envelope.origin.as_deref());
    put_str(&mut fields, "job", envelope.job.as_deref());
    put_str(&mut fields, "index", envelope.index.as_deref());
    match &envelope.event {
        Event::LogMessage(log) => {
            put_str(&mut fields, "message", log.message.as_deref());
            put_str(&mut fields, "messageType", log.message_type.as_deref());
            put_str(&mut fields, "appId", log.app_id.as_deref());
            put_str(&mut fields, "sourceType", log.source_type.as_deref());
        },
        Event::Error(error) => {
            put_str(&mut fields, "source", Some(&error.source));
            put_str(&mut fields, "message", Some(&error.message));
            fields.insert("code".into(), Value::from(error.code));
        },
        Event::HttpStartStop(http) => {
            put_str(&mut fields, "method", http.method.as_deref());
            put_str(&mut fields, "uri", http.uri.as_deref());
            if let Some(status) = http.status_code {
                fields.insert("statusCode".into(), Value::from(status));
            }
        },
        Event::ValueMetric(value) => {
            put_str(&mut fields, "name", Some(&value.name));
            fields.insert("value".into(), Value::from(value.value));
        },
        Event::CounterEvent(counter) => {
            put_str(&mut fields, "name", Some(&counter.name));
            fields.insert("total".into(), Value::from(counter.total));
        },
        Event::ContainerMetric(container) => {
            put_str(&mut fields, "applicationId", container.application_id.as_deref());
        },
    }
    fields
}

fn put_str(fields: &mut LogFields, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.insert(key.into(), Value::from(value));
    }
}

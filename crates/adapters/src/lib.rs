//! # nozzle-adapters
//!
//! Adapter implementations for the nozzle ports: app-info directories, the
//! unit parser, metric writers and recorders, loggers, and envelope JSON
//! decoding. This crate depends on `ports`, `domain`, and `shared`.

pub mod app_info;
pub mod envelope_json;
pub mod line_sink;
pub mod logger;
pub mod metric_writer;
pub mod recorder;
pub mod tracing_logger;
pub mod units;

pub use app_info::{InMemoryAppInfoDirectory, NullAppInfoDirectory};
pub use envelope_json::{EnvelopeDecodeError, decode_envelope_json};
pub use line_sink::{LineSink, MemoryLineSink, StderrLineSink, StdoutLineSink};
pub use logger::JsonLogger;
pub use metric_writer::{JsonLinesMetricWriter, metric_line};
pub use recorder::MetricRecorder;
pub use tracing_logger::TracingLogger;
pub use units::{UnitParser, normalize_unit};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nozzle_ports::ports_crate_version;
    use nozzle_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;
        let mut in_dev_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                in_dev_deps = line == "[dev-dependencies]";
                continue;
            }
            if !(in_deps || in_dev_deps) {
                continue;
            }
            if line.starts_with("nozzle-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn adapters_do_not_depend_on_app_or_config() {
        let deps = workspace_deps();
        let forbidden = ["nozzle-app", "nozzle-config"];

        for dep in &deps {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_crate_compiles() {
        assert!(!adapters_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}

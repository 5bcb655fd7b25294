//! Config command handlers.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output};
use nozzle_config::{NozzleEnv, ValidatedNozzleConfig, load_config_from_path, to_pretty_json};
use nozzle_shared::ErrorEnvelope;
use std::path::Path;

/// Validate the effective config.
pub fn run_config_check(mode: OutputMode, path: Option<&Path>) -> Result<CliOutput, CliError> {
    let config = match load_effective(path) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };
    config_check_output(mode, path, &config)
}

/// Print the effective config with secrets redacted.
pub fn run_config_show(mode: OutputMode, path: Option<&Path>) -> Result<CliOutput, CliError> {
    let config = match load_effective(path) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };
    config_show_output(mode, path, &config)
}

fn load_effective(path: Option<&Path>) -> Result<ValidatedNozzleConfig, ErrorEnvelope> {
    let env = NozzleEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_config_from_path(path, &env)
}

pub fn config_check_output(
    mode: OutputMode,
    path: Option<&Path>,
    config: &ValidatedNozzleConfig,
) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "heartbeatRateSecs": config.nozzle.heartbeat_rate_secs,
            "eventsToLogging": config.events.logging,
            "eventsToMonitoring": config.events.monitoring,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        path.map_or_else(
            || "status: ok\nconfig: ok\n".to_string(),
            |path| format!("status: ok\nconfig: ok\npath: {}\n", path.to_string_lossy()),
        )
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

pub fn config_show_output(
    mode: OutputMode,
    path: Option<&Path>,
    config: &ValidatedNozzleConfig,
) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        let effective: serde_json::Value = serde_json::from_str(to_pretty_json(config)?.trim())?;
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": effective,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        let mut out = String::from("status: ok\nconfig:\n");
        for (key, value) in config.to_redacted_fields() {
            out.push_str("  ");
            out.push_str(&key);
            out.push_str(": ");
            out.push_str(&value);
            out.push('\n');
        }
        out
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

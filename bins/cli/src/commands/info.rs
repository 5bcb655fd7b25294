//! Info command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use nozzle_adapters::adapters_crate_version;
use nozzle_app::app_crate_version;
use nozzle_config::config_crate_version;

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        format_info_json()?
    } else {
        format_info_text()
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_info_text() -> String {
    format!(
        "status: ok\nname: {}\nversion: {}\napp: {}\nadapters: {}\nconfig: {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        app_crate_version(),
        adapters_crate_version(),
        config_crate_version(),
    )
}

fn format_info_json() -> Result<String, CliError> {
    let payload = serde_json::json!({
        "status": "ok",
        "build": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "appVersion": app_crate_version(),
            "adaptersVersion": adapters_crate_version(),
            "configVersion": config_crate_version(),
        }
    });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}

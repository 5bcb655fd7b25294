//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{RunCommandInput, run_config_check, run_config_show, run_info, run_nozzle};
use error::{CliError, ExitCode};
use format::{LogFormat, OutputArgs, OutputMode};
use nozzle_shared::{ErrorEnvelope, redact_if_secret};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "nozzle",
    version,
    about = "Firehose metrics nozzle",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show build and version details.
    Info,
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Read JSON-lines envelopes and emit metrics until end of input.
    Run {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Envelope input file (defaults to stdin).
        #[arg(long)]
        input: Option<PathBuf>,
        /// JSON file mapping application ids to app metadata.
        #[arg(long)]
        app_info: Option<PathBuf>,
        /// Log rendering on stderr.
        #[arg(long, value_enum, default_value_t = LogFormat::Json)]
        log_format: LogFormat,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate the effective config.
    Check {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print the effective config with secrets redacted.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    match run(cli.command, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(command: Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    match command {
        Commands::Info => run_info(mode),
        Commands::Config { command } => match command {
            ConfigCommands::Check { path } => run_config_check(mode, path.as_deref()),
            ConfigCommands::Show { path } => run_config_show(mode, path.as_deref()),
        },
        Commands::Run {
            config,
            input,
            app_info,
            log_format,
        } => run_nozzle(
            mode,
            &RunCommandInput {
                config,
                input,
                app_info,
                log_format,
            },
        ),
    }
}

pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &ErrorEnvelope,
    exit_code: ExitCode,
) -> CliOutput {
    let error = sanitize_error(error);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": {
                "code": error.code.to_string(),
                "message": error.message,
                "kind": error.kind.to_string(),
                "metadata": error.metadata,
            },
        });

        // This is a CLI boundary, so JSON serialization errors are internal.
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\",\"kind\":\"invariant\"}}".to_string()
        });
        output.push('\n');
        output
    } else {
        format_error_text(&error)
    };

    CliOutput {
        stdout,
        stderr: "command failed\n".to_string(),
        exit_code,
    }
}

fn sanitize_error(error: &ErrorEnvelope) -> ErrorEnvelope {
    let mut error = error.clone();
    for (key, value) in &mut error.metadata {
        *value = redact_if_secret(key, value);
    }
    error
}

fn format_error_text(error: &ErrorEnvelope) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code.to_string());
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(&error.kind.to_string());
    out.push('\n');

    if !error.metadata.is_empty() {
        out.push_str("meta:\n");
        for (key, value) in &error.metadata {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::config::{config_check_output, config_show_output};
    use crate::format::OutputFormat;
    use clap::CommandFactory;
    use nozzle_config::{NozzleEnv, load_config_from_sources};
    use nozzle_shared::ErrorCode;
    use std::collections::BTreeMap;
    use std::path::Path;

    const JSON_MODE: OutputMode = OutputMode {
        format: OutputFormat::Json,
    };
    const TEXT_MODE: OutputMode = OutputMode {
        format: OutputFormat::Text,
    };

    fn env_with_password() -> Result<NozzleEnv, Box<dyn std::error::Error>> {
        let vars = BTreeMap::from([
            (
                "FIREHOSE_ENDPOINT".to_string(),
                "wss://doppler.example.com".to_string(),
            ),
            (
                "FIREHOSE_SUBSCRIPTION_ID".to_string(),
                "sub".to_string(),
            ),
            (
                "FIREHOSE_PASSWORD".to_string(),
                "hunter2".to_string(),
            ),
        ]);
        Ok(NozzleEnv::from_map(&vars)?)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn version_flag_is_supported() {
        let result = Cli::command().try_get_matches_from(["nozzle", "--version"]);
        let is_version = matches!(
            result,
            Err(error) if error.kind() == clap::error::ErrorKind::DisplayVersion
        );

        assert!(is_version, "expected clap to render version");
    }

    #[test]
    fn run_flags_parse() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::try_parse_from([
            "nozzle",
            "run",
            "--input",
            "events.jsonl",
            "--app-info",
            "apps.json",
            "--log-format",
            "tracing",
            "--json",
        ])?;
        assert!(OutputMode::from_args(&cli.output).is_json());
        let Commands::Run {
            input,
            app_info,
            log_format,
            config,
        } = cli.command
        else {
            return Err("expected run command".into());
        };
        assert_eq!(input.as_deref(), Some(Path::new("events.jsonl")));
        assert_eq!(app_info.as_deref(), Some(Path::new("apps.json")));
        assert_eq!(log_format, LogFormat::Tracing);
        assert!(config.is_none());
        Ok(())
    }

    #[test]
    fn config_show_redacts_password() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_config_from_sources(None, &env_with_password()?)?;

        let json = config_show_output(JSON_MODE, None, &config)?;
        assert!(!json.stdout.contains("hunter2"));
        let payload: serde_json::Value = serde_json::from_str(&json.stdout)?;
        assert_eq!(payload["status"], "ok");
        assert_eq!(
            payload["effectiveConfig"]["firehose"]["subscriptionId"],
            "sub"
        );

        let text = config_show_output(TEXT_MODE, None, &config)?;
        assert!(text.stdout.starts_with("status: ok\n"));
        assert!(!text.stdout.contains("hunter2"));
        Ok(())
    }

    #[test]
    fn config_check_reports_path() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_config_from_sources(None, &env_with_password()?)?;
        let output = config_check_output(TEXT_MODE, Some(Path::new("nozzle.toml")), &config)?;
        assert_eq!(output.exit_code, ExitCode::Ok);
        assert!(output.stdout.contains("path: nozzle.toml"));
        Ok(())
    }

    #[test]
    fn error_output_redacts_secret_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let error = ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad config")
            .with_metadata("password", "hunter2")
            .with_metadata("field", "firehose.endpoint");

        let output = format_error_output(JSON_MODE, &error, ExitCode::InvalidInput);
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        assert!(!output.stdout.contains("hunter2"));
        let payload: serde_json::Value = serde_json::from_str(&output.stdout)?;
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error"]["metadata"]["field"], "firehose.endpoint");

        let text = format_error_output(TEXT_MODE, &error, ExitCode::InvalidInput);
        assert!(text.stdout.contains("kind: expected"));
        assert!(!text.stdout.contains("hunter2"));
        Ok(())
    }
}

//! Config loading helpers (file + env).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{NozzleConfig, NozzleEnv, ValidatedNozzleConfig, apply_env_overrides};
use nozzle_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the nozzle config from an optional JSON document.
///
/// Precedence (highest wins):
/// - env overrides (`NozzleEnv`)
/// - config JSON
/// - defaults (`NozzleConfig::default()`)
pub fn load_config_from_sources(
    config_json: Option<&str>,
    env: &NozzleEnv,
) -> Result<ValidatedNozzleConfig, ErrorEnvelope> {
    let config = match config_json {
        None => NozzleConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the nozzle config from an optional file path (`.json` or `.toml`).
pub fn load_config_from_path(
    config_path: Option<&Path>,
    env: &NozzleEnv,
) -> Result<ValidatedNozzleConfig, ErrorEnvelope> {
    let config = match config_path {
        None => NozzleConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    apply_env_overrides(config, env)
}

/// Load the nozzle config from std env and an optional file path.
pub fn load_config_std_env(
    config_path: Option<&Path>,
) -> Result<ValidatedNozzleConfig, ErrorEnvelope> {
    let env = NozzleEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_config_from_path(config_path, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
///
/// The password serializes as `[REDACTED]`.
pub fn to_pretty_json(config: &NozzleConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &NozzleConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<NozzleConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nozzle_domain::EventType;
    use std::error::Error;

    const BASE_JSON: &str = r#"{
      "version": 1,
      "firehose": { "endpoint": "wss://doppler.example.com", "subscriptionId": "from-file" },
      "events": { "monitoring": ["ValueMetric"] },
      "nozzle": { "heartbeatRateSecs": 10 }
    }"#;

    #[test]
    fn env_wins_over_file() -> Result<(), Box<dyn Error>> {
        let env = NozzleEnv {
            firehose_subscription_id: Some("from-env".into()),
            heartbeat_rate_secs: Some(60),
            ..NozzleEnv::default()
        };

        let config = load_config_from_sources(Some(BASE_JSON), &env)?;
        assert_eq!(config.firehose.subscription_id.as_deref(), Some("from-env"));
        assert_eq!(config.nozzle.heartbeat_rate_secs, 60);
        assert_eq!(config.events.monitoring, vec![EventType::ValueMetric]);
        Ok(())
    }

    #[test]
    fn env_alone_produces_a_valid_config() -> Result<(), Box<dyn Error>> {
        let env = NozzleEnv {
            firehose_endpoint: Some("https://doppler.example.com".into()),
            firehose_subscription_id: Some("sub".into()),
            events_logging: Some(vec![EventType::LogMessage]),
            ..NozzleEnv::default()
        };

        let config = load_config_from_sources(None, &env)?;
        assert_eq!(config.version, 1);
        assert_eq!(&*config.nozzle.zone, "local-nozzle");
        assert!(config.forwards_to_logging(EventType::LogMessage));
        Ok(())
    }

    #[test]
    fn invalid_file_value_overridden_by_valid_env_succeeds() -> Result<(), Box<dyn Error>> {
        let config_json = r#"{
          "firehose": { "endpoint": "wss://doppler.example.com", "subscriptionId": "sub" },
          "events": { "monitoring": ["CounterEvent"] },
          "nozzle": { "heartbeatRateSecs": 0 }
        }"#;
        let env = NozzleEnv {
            heartbeat_rate_secs: Some(15),
            ..NozzleEnv::default()
        };

        let config = load_config_from_sources(Some(config_json), &env)?;
        assert_eq!(config.nozzle.heartbeat_rate_secs, 15);
        Ok(())
    }

    #[test]
    fn empty_env_list_clears_file_selection() -> Result<(), Box<dyn Error>> {
        let env = NozzleEnv {
            events_monitoring: Some(Vec::new()),
            ..NozzleEnv::default()
        };

        let error = load_config_from_sources(Some(BASE_JSON), &env)
            .err()
            .ok_or("expected no-events error")?;
        assert_eq!(error.code, ErrorCode::new("config", "no_events_selected"));
        Ok(())
    }

    #[test]
    fn malformed_json_is_tagged_with_source() -> Result<(), Box<dyn Error>> {
        let error = load_config_from_sources(Some(r#"{ "version": }"#), &NozzleEnv::default())
            .err()
            .ok_or("expected parse error")?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_json"));
        assert_eq!(
            error.metadata.get("source").map(String::as_str),
            Some("config")
        );
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() -> Result<(), Box<dyn Error>> {
        let error = detect_config_format(Path::new("nozzle.yaml"))
            .err()
            .ok_or("expected format error")?;
        assert_eq!(error.code, ErrorCode::new("config", "unsupported_format"));
        Ok(())
    }

    #[test]
    fn serialization_is_deterministic_and_redacted() -> Result<(), Box<dyn Error>> {
        let config = load_config_from_sources(Some(BASE_JSON), &NozzleEnv::default())?;
        let first = to_pretty_json(&config)?;
        let second = to_pretty_json(&config)?;
        assert_eq!(first, second);
        let value: serde_json::Value = serde_json::from_str(&first)?;
        assert_eq!(value["firehose"]["password"], "[REDACTED]");
        assert!(to_pretty_toml(&config)?.ends_with('\n'));
        Ok(())
    }
}

//! Environment variable parsing and env-to-config merging.
//!
//! This module keeps env parsing:
//! - strict (invalid values fail fast)
//! - deterministic (event-type CSV lists normalize to sorted/deduped values)
//! - safe (secret values are redacted in error metadata)

use crate::schema::{NozzleConfig, ValidatedNozzleConfig};
use nozzle_domain::EventType;
use nozzle_shared::{ErrorCode, ErrorEnvelope, SecretString, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Env var: event-bus endpoint URL.
pub const ENV_FIREHOSE_ENDPOINT: &str = "FIREHOSE_ENDPOINT";
/// Env var: subscription id.
pub const ENV_FIREHOSE_SUBSCRIPTION_ID: &str = "FIREHOSE_SUBSCRIPTION_ID";
/// Env var: firehose username.
pub const ENV_FIREHOSE_USERNAME: &str = "FIREHOSE_USERNAME";
/// Env var: firehose password (secret).
// gitleaks:allow
pub const ENV_FIREHOSE_PASSWORD: &str = "FIREHOSE_PASSWORD";
/// Env var: skip TLS verification.
pub const ENV_FIREHOSE_SKIP_SSL: &str = "FIREHOSE_SKIP_SSL";
/// Env var: event types routed to logging (CSV).
pub const ENV_EVENTS_TO_LOGGING: &str = "FIREHOSE_EVENTS_TO_STACKDRIVER_LOGGING";
/// Env var: event types routed to monitoring (CSV).
pub const ENV_EVENTS_TO_MONITORING: &str = "FIREHOSE_EVENTS_TO_STACKDRIVER_MONITORING";
/// Env var: nozzle instance id.
pub const ENV_NOZZLE_ID: &str = "NOZZLE_ID";
/// Env var: nozzle instance name.
pub const ENV_NOZZLE_NAME: &str = "NOZZLE_NAME";
/// Env var: nozzle zone.
pub const ENV_NOZZLE_ZONE: &str = "NOZZLE_ZONE";
/// Env var: heartbeat flush period in seconds.
pub const ENV_HEARTBEAT_RATE: &str = "HEARTBEAT_RATE";
/// Env var: resolve application metadata for labels.
pub const ENV_RESOLVE_APP_METADATA: &str = "RESOLVE_APP_METADATA";
/// Env var: verbose diagnostics.
pub const ENV_DEBUG_NOZZLE: &str = "DEBUG_NOZZLE";

/// Every env var read by [`NozzleEnv::from_std_env`].
pub const ALL_ENV_VARS: [&str; 13] = [
    ENV_FIREHOSE_ENDPOINT,
    ENV_FIREHOSE_SUBSCRIPTION_ID,
    ENV_FIREHOSE_USERNAME,
    ENV_FIREHOSE_PASSWORD,
    ENV_FIREHOSE_SKIP_SSL,
    ENV_EVENTS_TO_LOGGING,
    ENV_EVENTS_TO_MONITORING,
    ENV_NOZZLE_ID,
    ENV_NOZZLE_NAME,
    ENV_NOZZLE_ZONE,
    ENV_HEARTBEAT_RATE,
    ENV_RESOLVE_APP_METADATA,
    ENV_DEBUG_NOZZLE,
];

/// Typed env-derived overrides for `NozzleConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NozzleEnv {
    /// Override for `firehose.endpoint`.
    pub firehose_endpoint: Option<Box<str>>,
    /// Override for `firehose.subscriptionId`.
    pub firehose_subscription_id: Option<Box<str>>,
    /// Override for `firehose.username`.
    pub firehose_username: Option<Box<str>>,
    /// Override for `firehose.password`.
    pub firehose_password: Option<SecretString>,
    /// Override for `firehose.skipSsl`.
    pub firehose_skip_ssl: Option<bool>,
    /// Override for `events.logging` (full replacement).
    pub events_logging: Option<Vec<EventType>>,
    /// Override for `events.monitoring` (full replacement).
    pub events_monitoring: Option<Vec<EventType>>,
    /// Override for `nozzle.id`.
    pub nozzle_id: Option<Box<str>>,
    /// Override for `nozzle.name`.
    pub nozzle_name: Option<Box<str>>,
    /// Override for `nozzle.zone`.
    pub nozzle_zone: Option<Box<str>>,
    /// Override for `nozzle.heartbeatRateSecs`.
    pub heartbeat_rate_secs: Option<u32>,
    /// Override for `nozzle.resolveAppMetadata`.
    pub resolve_app_metadata: Option<bool>,
    /// Override for `nozzle.debug`.
    pub debug: Option<bool>,
}

impl NozzleEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            firehose_endpoint: parse_optional_url_string(map, ENV_FIREHOSE_ENDPOINT)?,
            firehose_subscription_id: parse_optional_trimmed_string(
                map,
                ENV_FIREHOSE_SUBSCRIPTION_ID,
            )?,
            firehose_username: parse_optional_trimmed_string(map, ENV_FIREHOSE_USERNAME)?,
            firehose_password: parse_optional_secret(map, ENV_FIREHOSE_PASSWORD)?,
            firehose_skip_ssl: parse_optional_bool(map, ENV_FIREHOSE_SKIP_SSL)?,
            events_logging: parse_optional_csv_event_types(map, ENV_EVENTS_TO_LOGGING)?,
            events_monitoring: parse_optional_csv_event_types(map, ENV_EVENTS_TO_MONITORING)?,
            nozzle_id: parse_optional_trimmed_string(map, ENV_NOZZLE_ID)?,
            nozzle_name: parse_optional_trimmed_string(map, ENV_NOZZLE_NAME)?,
            nozzle_zone: parse_optional_trimmed_string(map, ENV_NOZZLE_ZONE)?,
            heartbeat_rate_secs: parse_optional_u32(map, ENV_HEARTBEAT_RATE)?,
            resolve_app_metadata: parse_optional_bool(map, ENV_RESOLVE_APP_METADATA)?,
            debug: parse_optional_bool(map, ENV_DEBUG_NOZZLE)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ALL_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: NozzleConfig,
    env: &NozzleEnv,
) -> Result<ValidatedNozzleConfig, ErrorEnvelope> {
    let mut config = base;

    let firehose = &mut config.firehose;
    set_opt_box_str(&mut firehose.endpoint, env.firehose_endpoint.as_deref());
    set_opt_box_str(
        &mut firehose.subscription_id,
        env.firehose_subscription_id.as_deref(),
    );
    set_clone(&mut firehose.username, env.firehose_username.as_ref());
    set_clone(&mut firehose.password, env.firehose_password.as_ref());
    set_copy(&mut firehose.skip_ssl, env.firehose_skip_ssl);

    set_clone(&mut config.events.logging, env.events_logging.as_ref());
    set_clone(&mut config.events.monitoring, env.events_monitoring.as_ref());

    let nozzle = &mut config.nozzle;
    set_clone(&mut nozzle.id, env.nozzle_id.as_ref());
    set_clone(&mut nozzle.name, env.nozzle_name.as_ref());
    set_clone(&mut nozzle.zone, env.nozzle_zone.as_ref());
    set_copy(&mut nozzle.heartbeat_rate_secs, env.heartbeat_rate_secs);
    set_copy(&mut nozzle.resolve_app_metadata, env.resolve_app_metadata);
    set_copy(&mut nozzle.debug, env.debug);

    config.validate_and_normalize().map_err(Into::into)
}

fn set_opt_box_str(field: &mut Option<Box<str>>, value: Option<&str>) {
    if let Some(value) = value {
        *field = Some(value.into());
    }
}

fn set_clone<T: Clone>(field: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        *field = value.clone();
    }
}

const fn set_copy<T: Copy>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// Typed env parsing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// URL env var had an invalid value.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Event-type CSV contained an unknown event name.
    InvalidEventType {
        /// Env var name.
        var: &'static str,
        /// Invalid entry.
        entry: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
            Self::InvalidEventType { .. } => ErrorCode::new("config", "invalid_env_event_type"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be a valid URL"),
            Self::InvalidEventType { var, entry } => {
                write!(formatter, "{var} contains unknown event type: {entry}")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope.with_metadata("env_var", var)
            },
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_if_secret(var, &value)),
            EnvParseError::InvalidEventType { var, entry } => envelope
                .with_metadata("env_var", var)
                .with_metadata("entry", entry),
        }
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.into()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed)))
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Url::parse(trimmed).map_err(|_| EnvParseError::InvalidUrl {
        var,
        value: raw.clone(),
    })?;

    Ok(Some(trimmed.into()))
}

/// An empty CSV means "no event types" and clears the file value.
fn parse_optional_csv_event_types(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Vec<EventType>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let mut kinds = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let kind = EventType::parse(entry).ok_or_else(|| EnvParseError::InvalidEventType {
            var,
            entry: entry.to_owned(),
        })?;
        kinds.push(kind);
    }

    kinds.sort_unstable();
    kinds.dedup();
    Ok(Some(kinds))
}

//! Nozzle configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization sorts and de-duplicates the event-type selections.

use nozzle_domain::EventType;
use nozzle_shared::{ErrorCode, ErrorEnvelope, REDACTED, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Default nozzle id, name, and zone.
pub const DEFAULT_NOZZLE_IDENTITY: &str = "local-nozzle";

/// Default firehose credentials (username and password).
pub const DEFAULT_FIREHOSE_CREDENTIAL: &str = "admin";

/// Default heartbeat flush period in seconds.
pub const DEFAULT_HEARTBEAT_RATE_SECS: u32 = 30;

const HEARTBEAT_RATE_MIN_SECS: u32 = 1;
const HEARTBEAT_RATE_MAX_SECS: u32 = 3_600;

const FIREHOSE_ENDPOINT_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

/// Strips credentials from a URL before it lands in an error message.
fn sanitize_url_for_error(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if (parsed.password().is_some() || !parsed.username().is_empty())
                && (parsed.set_username("").is_err() || parsed.set_password(None).is_err())
            {
                return "[invalid url: credentials]".to_string();
            }
            parsed.to_string()
        },
        Err(error) => format!("[invalid url: {error}]"),
    }
}

/// Top-level nozzle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct NozzleConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Event-bus connection settings.
    pub firehose: FirehoseConfig,
    /// Which event types feed logging and monitoring.
    pub events: EventsConfig,
    /// Nozzle identity and runtime flags.
    pub nozzle: NozzleIdentityConfig,
}

impl Default for NozzleConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            firehose: FirehoseConfig::default(),
            events: EventsConfig::default(),
            nozzle: NozzleIdentityConfig::default(),
        }
    }
}

impl NozzleConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedNozzleConfig, ConfigSchemaError> {
        self.validate_version()?;
        self.firehose.normalize();
        self.firehose.validate()?;
        self.events.normalize();
        self.events.validate()?;
        self.nozzle.normalize();
        self.nozzle.validate()?;
        Ok(ValidatedNozzleConfig { raw: self })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }

    /// Log-safe flat view of the config, keyed by dotted field path.
    ///
    /// The firehose password is always rendered as `[REDACTED]`.
    #[must_use]
    pub fn to_redacted_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            fields.insert(key.to_string(), value);
        };

        put("version", self.version.to_string());
        put(
            "firehose.endpoint",
            self.firehose
                .endpoint
                .as_deref()
                .map(sanitize_url_for_error)
                .unwrap_or_default(),
        );
        put(
            "firehose.subscriptionId",
            self.firehose.subscription_id.as_deref().unwrap_or_default().to_string(),
        );
        put("firehose.username", self.firehose.username.to_string());
        put("firehose.password", REDACTED.to_string());
        put("firehose.skipSsl", self.firehose.skip_ssl.to_string());
        put("events.logging", join_event_types(&self.events.logging));
        put("events.monitoring", join_event_types(&self.events.monitoring));
        put("nozzle.id", self.nozzle.id.to_string());
        put("nozzle.name", self.nozzle.name.to_string());
        put("nozzle.zone", self.nozzle.zone.to_string());
        put(
            "nozzle.heartbeatRateSecs",
            self.nozzle.heartbeat_rate_secs.to_string(),
        );
        put(
            "nozzle.resolveAppMetadata",
            self.nozzle.resolve_app_metadata.to_string(),
        );
        put("nozzle.debug", self.nozzle.debug.to_string());
        fields
    }
}

fn join_event_types(kinds: &[EventType]) -> String {
    kinds
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Validated config wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNozzleConfig {
    raw: NozzleConfig,
}

impl ValidatedNozzleConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &NozzleConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> NozzleConfig {
        self.raw
    }

    /// Heartbeat flush period.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.raw.nozzle.heartbeat_rate_secs))
    }

    /// Whether envelopes of this type are forwarded to the metric mapper.
    #[must_use]
    pub fn forwards_to_monitoring(&self, kind: EventType) -> bool {
        self.raw.events.monitoring.binary_search(&kind).is_ok()
    }

    /// Whether envelopes of this type are forwarded to the log output.
    #[must_use]
    pub fn forwards_to_logging(&self, kind: EventType) -> bool {
        self.raw.events.logging.binary_search(&kind).is_ok()
    }
}

impl AsRef<NozzleConfig> for ValidatedNozzleConfig {
    fn as_ref(&self) -> &NozzleConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedNozzleConfig {
    type Target = NozzleConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a nozzle config from a JSON string, applying validation and normalization.
pub fn parse_nozzle_config_json(input: &str) -> Result<ValidatedNozzleConfig, ErrorEnvelope> {
    let config: NozzleConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a nozzle config from a TOML string, applying validation and normalization.
pub fn parse_nozzle_config_toml(input: &str) -> Result<ValidatedNozzleConfig, ErrorEnvelope> {
    let config: NozzleConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Event-bus connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct FirehoseConfig {
    /// Event-bus endpoint URL (required).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Box<str>>,
    /// Subscription id shared by all nozzle instances (required).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<Box<str>>,
    /// Username used to obtain an access token.
    pub username: Box<str>,
    /// Password used to obtain an access token.
    pub password: SecretString,
    /// Skip TLS verification.
    pub skip_ssl: bool,
}

impl Default for FirehoseConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            subscription_id: None,
            username: DEFAULT_FIREHOSE_CREDENTIAL.into(),
            password: SecretString::new(DEFAULT_FIREHOSE_CREDENTIAL),
            skip_ssl: false,
        }
    }
}

impl FirehoseConfig {
    fn normalize(&mut self) {
        trim_optional(&mut self.endpoint);
        trim_optional(&mut self.subscription_id);
        self.username = self.username.trim().into();
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ConfigSchemaError::MissingField {
                section: "firehose",
                field: "endpoint",
                env_var: crate::env::ENV_FIREHOSE_ENDPOINT,
            })?;
        validate_endpoint_url(endpoint)?;

        if self.subscription_id.is_none() {
            return Err(ConfigSchemaError::MissingField {
                section: "firehose",
                field: "subscriptionId",
                env_var: crate::env::ENV_FIREHOSE_SUBSCRIPTION_ID,
            });
        }
        Ok(())
    }
}

fn validate_endpoint_url(endpoint: &str) -> Result<(), ConfigSchemaError> {
    let invalid = || ConfigSchemaError::InvalidUrl {
        section: "firehose",
        field: "endpoint",
        value: sanitize_url_for_error(endpoint),
    };
    let parsed = Url::parse(endpoint).map_err(|_| invalid())?;
    if !FIREHOSE_ENDPOINT_SCHEMES.contains(&parsed.scheme()) {
        return Err(invalid());
    }
    Ok(())
}

/// Which event types are routed to logging and to monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct EventsConfig {
    /// Event types written as log entries.
    pub logging: Vec<EventType>,
    /// Event types converted to metrics.
    pub monitoring: Vec<EventType>,
}

impl EventsConfig {
    fn normalize(&mut self) {
        self.logging.sort_unstable();
        self.logging.dedup();
        self.monitoring.sort_unstable();
        self.monitoring.dedup();
    }

    const fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.logging.is_empty() && self.monitoring.is_empty() {
            return Err(ConfigSchemaError::NoEventsSelected);
        }
        Ok(())
    }
}

/// Nozzle identity and runtime flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct NozzleIdentityConfig {
    /// Instance id.
    pub id: Box<str>,
    /// Instance name, used as the heartbeat `instance` label.
    pub name: Box<str>,
    /// Deployment zone, used as the heartbeat `zone` label.
    pub zone: Box<str>,
    /// Heartbeat flush period in seconds.
    pub heartbeat_rate_secs: u32,
    /// Resolve application metadata for labels.
    pub resolve_app_metadata: bool,
    /// Verbose diagnostics.
    pub debug: bool,
}

impl Default for NozzleIdentityConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_NOZZLE_IDENTITY.into(),
            name: DEFAULT_NOZZLE_IDENTITY.into(),
            zone: DEFAULT_NOZZLE_IDENTITY.into(),
            heartbeat_rate_secs: DEFAULT_HEARTBEAT_RATE_SECS,
            resolve_app_metadata: false,
            debug: false,
        }
    }
}

impl NozzleIdentityConfig {
    fn normalize(&mut self) {
        self.id = self.id.trim().into();
        self.name = self.name.trim().into();
        self.zone = self.zone.trim().into();
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        for (field, value) in [("id", &self.id), ("name", &self.name), ("zone", &self.zone)] {
            if value.is_empty() {
                return Err(ConfigSchemaError::EmptyField {
                    section: "nozzle",
                    field,
                });
            }
        }

        if !(HEARTBEAT_RATE_MIN_SECS..=HEARTBEAT_RATE_MAX_SECS).contains(&self.heartbeat_rate_secs)
        {
            return Err(ConfigSchemaError::LimitOutOfRange {
                section: "nozzle",
                field: "heartbeatRateSecs",
                value: u64::from(self.heartbeat_rate_secs),
                min: u64::from(HEARTBEAT_RATE_MIN_SECS),
                max: u64::from(HEARTBEAT_RATE_MAX_SECS),
            });
        }
        Ok(())
    }
}

fn trim_optional(field: &mut Option<Box<str>>) {
    *field = field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(Into::into);
}

/// Typed config validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A required field is missing.
    MissingField {
        /// Schema section (e.g. `firehose`).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Env var that can supply the value.
        env_var: &'static str,
    },
    /// A string field is empty after trimming.
    EmptyField {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
    },
    /// A URL entry is invalid.
    InvalidUrl {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Sanitized value.
        value: String,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// Neither logging nor monitoring selects any event type.
    NoEventsSelected,
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::MissingField { .. } => ErrorCode::new("config", "missing_field"),
            Self::EmptyField { .. } => ErrorCode::new("config", "empty_field"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::NoEventsSelected => ErrorCode::new("config", "no_events_selected"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    formatter,
                    "unsupported config version: {found} (supported: {supported})"
                )
            },
            Self::MissingField {
                section,
                field,
                env_var,
            } => write!(
                formatter,
                "{section}.{field} is required (set it in the config file or via {env_var})"
            ),
            Self::EmptyField { section, field } => {
                write!(formatter, "{section}.{field} must be non-empty")
            },
            Self::InvalidUrl {
                section,
                field,
                value,
            } => write!(formatter, "{section}.{field} must be a valid URL: {value}"),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} is out of range: {value} (allowed: {min}..={max})"
            ),
            Self::NoEventsSelected => write!(
                formatter,
                "one of {} or {} must select at least one event type",
                crate::env::ENV_EVENTS_TO_LOGGING,
                crate::env::ENV_EVENTS_TO_MONITORING
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::MissingField {
                section,
                field,
                env_var,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("env_var", env_var),
            ConfigSchemaError::EmptyField { section, field } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field),
            ConfigSchemaError::InvalidUrl {
                section,
                field,
                value,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value),
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
            ConfigSchemaError::NoEventsSelected => envelope
                .with_metadata("logging_env_var", crate::env::ENV_EVENTS_TO_LOGGING)
                .with_metadata("monitoring_env_var", crate::env::ENV_EVENTS_TO_MONITORING),
        }
    }
}

//! # nozzle-config
//!
//! Configuration schema, validation, env parsing, and loading for the nozzle.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (file + env).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{ALL_ENV_VARS, EnvParseError, NozzleEnv, apply_env_overrides};
pub use load::{
    load_config_from_path, load_config_from_sources, load_config_std_env, to_pretty_json,
    to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, DEFAULT_FIREHOSE_CREDENTIAL,
    DEFAULT_HEARTBEAT_RATE_SECS, DEFAULT_NOZZLE_IDENTITY, EventsConfig, FirehoseConfig,
    NozzleConfig, NozzleIdentityConfig, ValidatedNozzleConfig, parse_nozzle_config_json,
    parse_nozzle_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

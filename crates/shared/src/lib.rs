//! # nozzle-shared
//!
//! Shared error handling and redaction helpers for the nozzle workspace.
//!
//! - `ErrorEnvelope` / `ErrorCode`: the error type every crate boundary returns
//! - `Result<T>`: workspace-wide result alias
//! - Secret detection and redaction for config and log output
//!
//! This crate only depends on external crates.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod redaction;

pub use errors::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, Result};
pub use redaction::{REDACTED, SecretString, is_secret_key, redact_if_secret};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

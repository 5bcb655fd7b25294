//! Application metadata directories.

use nozzle_domain::AppInfo;
use nozzle_ports::AppInfoDirectoryPort;
use nozzle_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Directory that never resolves anything.
///
/// Used when app-metadata resolution is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAppInfoDirectory;

impl AppInfoDirectoryPort for NullAppInfoDirectory {
    fn lookup(&self, _app_guid: &str) -> AppInfo {
        AppInfo::empty()
    }
}

/// Fixed guid-to-metadata table.
#[derive(Debug, Default)]
pub struct InMemoryAppInfoDirectory {
    apps: BTreeMap<String, AppInfo>,
    lookups: AtomicUsize,
}

impl InMemoryAppInfoDirectory {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(guid, metadata)` pairs. Later duplicates win.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, AppInfo)>,
        K: Into<String>,
    {
        Self {
            apps: pairs
                .into_iter()
                .map(|(guid, info)| (guid.into(), info))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Parse a JSON object keyed by application guid.
    ///
    /// ```json
    /// { "<guid>": { "appName": "...", "spaceName": "...", "spaceGuid": "...",
    ///               "orgName": "...", "orgGuid": "..." } }
    /// ```
    pub fn from_json_str(input: &str) -> Result<Self> {
        let apps: BTreeMap<String, AppInfo> = serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("app_info", "invalid_json"),
                format!("invalid app info JSON: {error}"),
            )
        })?;
        Ok(Self::from_pairs(apps))
    }

    /// Read and parse a JSON app-info file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|error| {
            ErrorEnvelope::from(error).with_metadata("path", path.to_string_lossy().to_string())
        })?;
        Self::from_json_str(&contents)
            .map_err(|error| error.with_metadata("path", path.to_string_lossy().to_string()))
    }

    /// Add or replace one entry.
    #[must_use]
    pub fn with_app(mut self, guid: impl Into<String>, info: AppInfo) -> Self {
        self.apps.insert(guid.into(), info);
        self
    }

    /// Number of known applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// True when no application is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Number of `lookup` calls served so far.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl AppInfoDirectoryPort for InMemoryAppInfoDirectory {
    fn lookup(&self, app_guid: &str) -> AppInfo {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.apps.get(app_guid).cloned().unwrap_or_default()
    }
}

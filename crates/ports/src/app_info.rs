//! Application metadata lookup boundary.

use nozzle_domain::AppInfo;

/// Resolves an application guid to organizational metadata.
pub trait AppInfoDirectoryPort: Send + Sync {
    /// Look up `app_guid`.
    ///
    /// Unknown ids yield `AppInfo::empty()`; this never fails.
    fn lookup(&self, app_guid: &str) -> AppInfo;
}

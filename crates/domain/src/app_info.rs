//! Organizational metadata for a platform application.

use serde::{Deserialize, Serialize};

/// Application, space, and org names/guids for one application id.
///
/// A value with every field empty means "no metadata available".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppInfo {
    /// Application name.
    pub app_name: String,
    /// Space name.
    pub space_name: String,
    /// Space guid.
    pub space_guid: String,
    /// Organization name.
    pub org_name: String,
    /// Organization guid.
    pub org_guid: String,
}

impl AppInfo {
    /// The unresolved value.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.app_name.is_empty()
            && self.space_name.is_empty()
            && self.space_guid.is_empty()
            && self.org_name.is_empty()
            && self.org_guid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_app_info_is_empty() {
        assert!(AppInfo::empty().is_empty());
    }

    #[test]
    fn any_populated_field_makes_it_non_empty() {
        let info = AppInfo {
            org_guid: "b494fb47-3c44-4a98-9a08-d839ec5c799b".to_string(),
            ..AppInfo::default()
        };
        assert!(!info.is_empty());
    }
}

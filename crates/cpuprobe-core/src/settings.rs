//! Probe settings and validation.
//!
//! These are pure domain types with no infrastructure dependencies. The CLI
//! fills them from flags and `CPUPROBE_*` environment variables.

use serde::{Deserialize, Serialize};

/// Versioned shared object of the PICL hardware-inventory library.
pub const DEFAULT_INVENTORY_LIBRARY: &str = "libpicl.so.1";

/// Versioned shared object of the kstat library.
pub const DEFAULT_KSTAT_LIBRARY: &str = "libkstat.so.1";

/// Probe settings.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeSettings {
    /// Inventory library opened for the cache geometry walk.
    pub inventory_library: Option<String>,

    /// Library providing `kstat_open` and friends.
    pub kstat_library: Option<String>,

    /// Upper bound on device nodes visited, applied on top of the
    /// processor-count budget.
    pub max_walk_nodes: Option<usize>,
}

impl ProbeSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            inventory_library: Some(DEFAULT_INVENTORY_LIBRARY.to_string()),
            kstat_library: Some(DEFAULT_KSTAT_LIBRARY.to_string()),
            max_walk_nodes: None,
        }
    }

    /// Get the effective inventory library name (with default fallback).
    pub fn effective_inventory_library(&self) -> &str {
        self.inventory_library
            .as_deref()
            .unwrap_or(DEFAULT_INVENTORY_LIBRARY)
    }

    /// Get the effective kstat library name (with default fallback).
    pub fn effective_kstat_library(&self) -> &str {
        self.kstat_library.as_deref().unwrap_or(DEFAULT_KSTAT_LIBRARY)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref library) = other.inventory_library {
            self.inventory_library.clone_from(library);
        }
        if let Some(ref library) = other.kstat_library {
            self.kstat_library.clone_from(library);
        }
        if let Some(ref nodes) = other.max_walk_nodes {
            self.max_walk_nodes = *nodes;
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub inventory_library: Option<Option<String>>,
    pub kstat_library: Option<Option<String>>,
    pub max_walk_nodes: Option<Option<usize>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Library name cannot be empty")]
    EmptyLibraryName,

    #[error("Walk budget must be at least 1 node, got {0}")]
    InvalidWalkBudget(usize),
}

/// Validate settings values.
pub fn validate_settings(settings: &ProbeSettings) -> Result<(), SettingsError> {
    let empty = |name: &Option<String>| name.as_ref().is_some_and(|n| n.trim().is_empty());
    if empty(&settings.inventory_library) || empty(&settings.kstat_library) {
        return Err(SettingsError::EmptyLibraryName);
    }

    if let Some(nodes) = settings.max_walk_nodes {
        if nodes == 0 {
            return Err(SettingsError::InvalidWalkBudget(nodes));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ProbeSettings::with_defaults();
        assert_eq!(settings.effective_inventory_library(), "libpicl.so.1");
        assert_eq!(settings.effective_kstat_library(), "libkstat.so.1");
        assert_eq!(settings.max_walk_nodes, None);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_effective_falls_back_when_unset() {
        let settings = ProbeSettings::default();
        assert_eq!(settings.effective_inventory_library(), DEFAULT_INVENTORY_LIBRARY);
        assert_eq!(settings.effective_kstat_library(), DEFAULT_KSTAT_LIBRARY);
    }

    #[test]
    fn test_merge_only_touches_set_fields() {
        let mut settings = ProbeSettings::with_defaults();
        settings.merge(&SettingsUpdate {
            inventory_library: Some(Some("/opt/lib/libpicl.so.1".to_string())),
            kstat_library: None,
            max_walk_nodes: Some(Some(4)),
        });
        assert_eq!(
            settings.effective_inventory_library(),
            "/opt/lib/libpicl.so.1"
        );
        assert_eq!(settings.effective_kstat_library(), "libkstat.so.1");
        assert_eq!(settings.max_walk_nodes, Some(4));

        settings.merge(&SettingsUpdate {
            max_walk_nodes: Some(None),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.max_walk_nodes, None);
    }

    #[test]
    fn test_rejects_empty_library() {
        let settings = ProbeSettings {
            inventory_library: Some("  ".to_string()),
            ..ProbeSettings::with_defaults()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyLibraryName)
        ));
    }

    #[test]
    fn test_rejects_zero_walk_budget() {
        let settings = ProbeSettings {
            max_walk_nodes: Some(0),
            ..ProbeSettings::with_defaults()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidWalkBudget(0))
        ));
    }
}

//! User preferences for snapkeep
//!
//! Holds the backup retention policy and the label applied to backups created
//! without an explicit reason.

use serde::{Deserialize, Serialize};

use super::paths::SnapkeepPaths;
use crate::backup::DEFAULT_REASON;
use crate::error::BackupError;
use crate::store::fs_ops::write_json_atomic;

/// Backup retention settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Maximum number of backups to keep (None keeps everything)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
}

/// User preferences for snapkeep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup retention policy
    #[serde(default)]
    pub backup_retention: BackupRetention,

    /// Reason recorded on backups created without one
    #[serde(default = "default_reason")]
    pub default_reason: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_reason() -> String {
    DEFAULT_REASON.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup_retention: BackupRetention::default(),
            default_reason: default_reason(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &SnapkeepPaths) -> Result<Self, BackupError> {
        let settings_path = paths.preferences_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                BackupError::Config(format!("Failed to read preferences file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                BackupError::Config(format!("Failed to parse preferences file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SnapkeepPaths) -> Result<(), BackupError> {
        std::fs::create_dir_all(paths.base_dir()).map_err(|e| {
            BackupError::Config(format!("Failed to create configuration directory: {}", e))
        })?;
        write_json_atomic(paths.preferences_file(), self)
            .map_err(|e| BackupError::Config(format!("Failed to write preferences file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.schema_version, 1);
        assert_eq!(settings.default_reason, "manual");
        assert!(settings.backup_retention.max_count.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapkeepPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.backup_retention.max_count = Some(5);
        settings.default_reason = "scheduled".to_string();

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.backup_retention.max_count, Some(5));
        assert_eq!(loaded.default_reason, "scheduled");
    }

    #[test]
    fn test_save_creates_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapkeepPaths::with_base_dir(temp_dir.path().join("fresh"));

        Settings::default().save(&paths).unwrap();
        assert!(paths.preferences_file().is_file());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.schema_version, 1);
        assert_eq!(settings.default_reason, "manual");
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapkeepPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.preferences_file(), "not json").unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
    }
}

//! Path management for snapkeep
//!
//! Provides XDG-compliant path resolution for the backed-up application files
//! and the snapshot store.
//!
//! ## Path Resolution Order
//!
//! 1. `SNAPKEEP_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/snapkeep` or `~/.config/snapkeep`
//! 3. Windows: `%APPDATA%\snapkeep`

use std::path::PathBuf;

use crate::backup::BackupConfig;
use crate::error::BackupError;

/// Manages all paths used by snapkeep
#[derive(Debug, Clone)]
pub struct SnapkeepPaths {
    /// Base directory for all snapkeep data
    base_dir: PathBuf,
}

impl SnapkeepPaths {
    /// Create a new SnapkeepPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, BackupError> {
        let base_dir = if let Ok(custom) = std::env::var("SNAPKEEP_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create SnapkeepPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/snapkeep/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (~/.config/snapkeep/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the snapshot store root (~/.config/snapkeep/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the application settings file that gets backed up
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }

    /// Get the path to the application database
    pub fn database_file(&self) -> PathBuf {
        self.data_dir().join("app.db")
    }

    /// Get the path to snapkeep's own preferences
    pub fn preferences_file(&self) -> PathBuf {
        self.base_dir.join("snapkeep.json")
    }

    /// Build the backup configuration from the default locations
    pub fn backup_config(&self) -> BackupConfig {
        BackupConfig::new(self.settings_file(), self.database_file(), self.backup_dir())
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, BackupError> {
    // Unix (Linux/macOS): Use XDG_CONFIG_HOME if set, otherwise ~/.config
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => {
            let home = std::env::var("HOME").map_err(|_| {
                BackupError::Config("HOME environment variable not set".into())
            })?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join("snapkeep"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, BackupError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| BackupError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("snapkeep"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapkeepPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var("SNAPKEEP_DATA_DIR", custom_path);

        let paths = SnapkeepPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());

        env::remove_var("SNAPKEEP_DATA_DIR");
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapkeepPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("settings.json"));
        assert_eq!(
            paths.database_file(),
            temp_dir.path().join("data").join("app.db")
        );
        assert_eq!(
            paths.preferences_file(),
            temp_dir.path().join("snapkeep.json")
        );
    }

    #[test]
    fn test_backup_config_uses_default_locations() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapkeepPaths::with_base_dir(temp_dir.path().to_path_buf());

        let config = paths.backup_config();
        assert_eq!(config.settings_file(), paths.settings_file().as_path());
        assert_eq!(config.database_file(), paths.database_file().as_path());
        assert_eq!(config.backup_dir(), paths.backup_dir().as_path());
    }
}

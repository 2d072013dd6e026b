//! Backup entry metadata
//!
//! Each promoted entry carries a `manifest.json` recording when and why it was
//! taken and which files were captured.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{EntryName, StoredEntry};

/// Reason recorded when the caller supplies none
pub const DEFAULT_REASON: &str = "manual";

/// Reason shown for entries whose manifest cannot be read
pub const UNKNOWN_REASON: &str = "unknown";

/// One file captured into an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFile {
    /// Path relative to the entry directory, `/`-separated
    pub path: String,
    /// Size in bytes at capture time
    pub size_bytes: u64,
}

impl CapturedFile {
    pub fn new(relative: &Path, size_bytes: u64) -> Self {
        Self {
            path: portable_path(relative),
            size_bytes,
        }
    }
}

/// On-disk metadata of an entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryManifest {
    /// Schema version for migration support
    pub schema_version: u32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub files: Vec<CapturedFile>,
}

impl EntryManifest {
    pub fn new(name: &EntryName, reason: String, files: Vec<CapturedFile>) -> Self {
        Self {
            schema_version: 1,
            name: name.to_string(),
            created_at: name.timestamp(),
            reason,
            files,
        }
    }

    /// Total bytes recorded across all captured files
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// A fully promoted backup as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// External handle used by delete/size
    pub name: String,
    /// Full path to the entry directory
    pub path: PathBuf,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// Caller-supplied label
    pub reason: String,
    /// Captured artifacts
    pub files: Vec<CapturedFile>,
    /// Combined size of the captured files in bytes
    pub size_bytes: u64,
}

impl BackupEntry {
    /// Describe a stored entry from its manifest
    pub fn from_manifest(stored: &StoredEntry, manifest: EntryManifest) -> Self {
        let size_bytes = manifest.total_size();
        Self {
            name: stored.name.to_string(),
            path: stored.path.clone(),
            // The directory name is authoritative for identity and ordering
            created_at: stored.name.timestamp(),
            reason: manifest.reason,
            files: manifest.files,
            size_bytes,
        }
    }

    /// Describe a stored entry whose manifest is unreadable
    pub fn without_manifest(stored: &StoredEntry, size_bytes: u64) -> Self {
        Self {
            name: stored.name.to_string(),
            path: stored.path.clone(),
            created_at: stored.name.timestamp(),
            reason: UNKNOWN_REASON.to_string(),
            files: Vec::new(),
            size_bytes,
        }
    }
}

/// Render a relative path with `/` separators regardless of platform
fn portable_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored() -> StoredEntry {
        let name = EntryName::at(Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap());
        StoredEntry {
            path: PathBuf::from("/backups").join(name.to_string()),
            name,
        }
    }

    #[test]
    fn test_captured_file_path_is_portable() {
        let file = CapturedFile::new(&Path::new("database").join("app.db"), 1);
        assert_eq!(file.path, "database/app.db");
    }

    #[test]
    fn test_from_manifest() {
        let stored = stored();
        let manifest = EntryManifest::new(
            &stored.name,
            "pre-update".to_string(),
            vec![
                CapturedFile::new(Path::new("settings/settings.json"), 16),
                CapturedFile::new(Path::new("database/app.db"), 1),
            ],
        );

        let entry = BackupEntry::from_manifest(&stored, manifest);
        assert_eq!(entry.name, "backup-20250304-050607-000");
        assert_eq!(entry.reason, "pre-update");
        assert_eq!(entry.size_bytes, 17);
        assert_eq!(entry.files.len(), 2);
    }

    #[test]
    fn test_manifest_json_shape() {
        let stored = stored();
        let manifest = EntryManifest::new(&stored.name, DEFAULT_REASON.to_string(), vec![]);
        let json = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["name"], "backup-20250304-050607-000");
        assert_eq!(json["reason"], "manual");
        assert_eq!(json["schema_version"], 1);
        assert!(json["files"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_without_manifest() {
        let entry = BackupEntry::without_manifest(&stored(), 42);
        assert_eq!(entry.reason, UNKNOWN_REASON);
        assert_eq!(entry.size_bytes, 42);
    }
}

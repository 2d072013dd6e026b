//! Custom error types for snapkeep
//!
//! This module defines the error hierarchy for backup operations using
//! thiserror. Every failure carries an [`ErrorKind`] so the command surface can
//! relay it to callers as structured data.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for snapkeep operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// The store root cannot be created, read or written
    #[error("Backup storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A required source file is absent at backup time
    #[error("Source file missing: {}", .path.display())]
    SourceMissing { path: PathBuf },

    /// An I/O error occurred while capturing files into a new entry
    #[error("Copy failed: {0}")]
    CopyFailed(String),

    /// The referenced entry does not exist
    #[error("Backup not found: {name}")]
    NotFound { name: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

/// Machine-readable classification of a [`BackupError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StorageUnavailable,
    SourceMissing,
    CopyFailed,
    NotFound,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StorageUnavailable => "storage_unavailable",
            Self::SourceMissing => "source_missing",
            Self::CopyFailed => "copy_failed",
            Self::NotFound => "not_found",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

impl BackupError {
    /// Create a "not found" error for a backup entry
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a "source missing" error
    pub fn source_missing(path: impl Into<PathBuf>) -> Self {
        Self::SourceMissing { path: path.into() }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::SourceMissing { .. } => ErrorKind::SourceMissing,
            Self::CopyFailed(_) => ErrorKind::CopyFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Config(_) | Self::Json(_) => ErrorKind::Config,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for snapkeep operations
pub type BackupResult<T> = Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackupError::StorageUnavailable("read-only filesystem".into());
        assert_eq!(
            err.to_string(),
            "Backup storage unavailable: read-only filesystem"
        );
    }

    #[test]
    fn test_not_found_error() {
        let err = BackupError::not_found("backup-20250101-000000-000");
        assert_eq!(
            err.to_string(),
            "Backup not found: backup-20250101-000000-000"
        );
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_source_missing_error() {
        let err = BackupError::source_missing("/tmp/settings.json");
        assert_eq!(err.to_string(), "Source file missing: /tmp/settings.json");
        assert_eq!(err.kind(), ErrorKind::SourceMissing);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::StorageUnavailable).unwrap();
        assert_eq!(json, "\"storage_unavailable\"");
        assert_eq!(ErrorKind::CopyFailed.to_string(), "copy_failed");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BackupError = json_err.into();
        assert!(matches!(err, BackupError::Json(_)));
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}

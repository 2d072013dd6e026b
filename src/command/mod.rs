//! Command surface for the backup manager
//!
//! Callers issue a [`BackupRequest`] and get back either a typed
//! [`BackupResponse`] or a [`CommandError`] carrying the failure kind and the
//! error message verbatim.
//!
//! [`BackupService`] is owned by the host and passed around by reference. It
//! builds the single [`BackupManager`] on the first request and hands the same
//! instance to every later one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::backup::{BackupConfig, BackupEntry, BackupManager};
use crate::error::{BackupError, ErrorKind};

/// A request to the backup manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum BackupRequest {
    /// Snapshot the settings file and database
    Create {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Enumerate backups, most recent first
    List,
    /// Delete a backup
    Delete { name: String },
    /// Total captured bytes of a backup
    Size { name: String },
    /// Delete all but the `keep` most recent backups
    Prune { keep: usize },
}

/// Successful outcome of a [`BackupRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum BackupResponse {
    Created { path: String },
    Listed { backups: Vec<BackupEntry> },
    Deleted { success: bool },
    Size { size: u64 },
    Pruned { deleted: Vec<String> },
}

/// Failed outcome of a [`BackupRequest`]
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<BackupError> for CommandError {
    fn from(err: BackupError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Entry point for backup requests
pub struct BackupService {
    config: BackupConfig,
    default_reason: Option<String>,
    max_count: Option<u32>,
    manager: OnceCell<Arc<BackupManager>>,
}

impl BackupService {
    /// Create a service for the given locations; the manager is built lazily
    pub fn new(config: BackupConfig) -> Self {
        Self {
            config,
            default_reason: None,
            max_count: None,
            manager: OnceCell::new(),
        }
    }

    /// Reason recorded on create requests that carry none
    pub fn with_default_reason(mut self, reason: impl Into<String>) -> Self {
        self.default_reason = Some(reason.into());
        self
    }

    /// Prune down to `max_count` backups after every successful create
    pub fn with_max_count(mut self, max_count: Option<u32>) -> Self {
        self.max_count = max_count;
        self
    }

    /// Get the configured locations
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// The shared manager, constructed and initialized on first use
    ///
    /// A failed initialization is logged and not fatal: the manager retries
    /// setup at the start of each mutating operation.
    pub async fn manager(&self) -> Arc<BackupManager> {
        self.manager
            .get_or_init(|| async {
                let manager = Arc::new(BackupManager::new(self.config.clone()));
                if let Err(e) = manager.initialize().await {
                    warn!(error = %e, "Backup manager unavailable, will retry on next operation");
                }
                manager
            })
            .await
            .clone()
    }

    /// Execute a request against the shared manager
    pub async fn handle(&self, request: BackupRequest) -> Result<BackupResponse, CommandError> {
        let manager = self.manager().await;

        let response = match request {
            BackupRequest::Create { reason } => {
                let reason = reason.or_else(|| self.default_reason.clone());
                // Retention failures are logged by the manager; the entry stands
                let (entry, pruned) = manager
                    .create_backup_with_retention(reason.as_deref(), self.max_count)
                    .await?;
                if !pruned.is_empty() {
                    debug!(name = %entry.name, pruned = pruned.len(), "Retention applied");
                }
                BackupResponse::Created { path: entry.name }
            }
            BackupRequest::List => BackupResponse::Listed {
                backups: manager.list_backups().await?,
            },
            BackupRequest::Delete { name } => {
                manager.delete_backup(&name).await?;
                BackupResponse::Deleted { success: true }
            }
            BackupRequest::Size { name } => BackupResponse::Size {
                size: manager.get_backup_size(&name).await?,
            },
            BackupRequest::Prune { keep } => BackupResponse::Pruned {
                deleted: manager.prune_backups(keep).await?,
            },
        };

        Ok(response)
    }
}

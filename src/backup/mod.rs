//! Backup system for snapkeep
//!
//! Snapshots the application's settings file and database into a managed,
//! enumerable, prunable archive.
//!
//! # Architecture
//!
//! - `BackupManager`: lifecycle plus create/list/size/delete/prune, with
//!   mutating operations serialized against each other
//! - `SnapshotStore` (in [`crate::store`]): directory layout, naming and
//!   enumeration
//!
//! # Backup Format
//!
//! Each backup is a directory `backup-YYYYMMDD-HHMMSS-mmm[-N]` under the store
//! root holding:
//! - `settings/<settings file>`: copy of the settings file
//! - `database/<database>`: copy of the database, plus any `-wal`, `-shm` or
//!   `-journal` siblings
//! - `manifest.json`: name, creation time, reason and captured files
//!
//! # Example
//!
//! ```rust,ignore
//! use snapkeep::backup::{BackupConfig, BackupManager};
//!
//! let manager = BackupManager::new(BackupConfig::new(
//!     "/app/settings.json",
//!     "/app/data/app.db",
//!     "/app/backups",
//! ));
//! manager.initialize().await?;
//!
//! let entry = manager.create_backup(Some("pre-update")).await?;
//! let size = manager.get_backup_size(&entry.name).await?;
//! manager.delete_backup(&entry.name).await?;
//! ```

pub mod entry;
mod manager;

pub use entry::{BackupEntry, CapturedFile, EntryManifest, DEFAULT_REASON};
pub use manager::{BackupConfig, BackupManager};

//! snapkeep - atomic snapshot backups of application state
//!
//! This library snapshots an application's settings file and database file
//! into a managed archive of backup entries that can be listed, sized,
//! pruned and deleted. Entries are assembled under a temporary name and
//! promoted with a single rename, so readers never observe a partially
//! written or partially deleted backup.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and user preferences
//! - `error`: Error taxonomy
//! - `store`: On-disk layout of backup entries
//! - `backup`: Backup manager (lifecycle and operations)
//! - `command`: Typed request/response surface over the manager
//! - `cli`: Command-line handlers
//! - `display`: Terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use snapkeep::command::{BackupRequest, BackupService};
//! use snapkeep::config::SnapkeepPaths;
//!
//! let paths = SnapkeepPaths::new()?;
//! let service = BackupService::new(paths.backup_config());
//! let response = service.handle(BackupRequest::Create { reason: None }).await?;
//! ```

pub mod backup;
pub mod cli;
pub mod command;
pub mod config;
pub mod display;
pub mod error;
pub mod store;

pub use error::{BackupError, BackupResult, ErrorKind};

//! CLI command handlers
//!
//! This module bridges the clap argument parsing with the backup command
//! surface.

pub mod backup;

pub use backup::{handle_backup_command, BackupCommands};

//! Backup CLI commands
//!
//! Maps CLI subcommands onto backup requests and prints the outcome either for
//! humans or as JSON.

use clap::Subcommand;
use serde::Serialize;

use crate::backup::BackupEntry;
use crate::command::{BackupRequest, BackupResponse, BackupService, CommandError};
use crate::display::{format_backup_details, format_backup_list, format_size};
use crate::error::BackupError;

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// Why the backup is taken (e.g. "pre-update")
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup name (use 'latest' for most recent)
        backup: String,
    },

    /// Show the total size of a backup's captured files
    Size {
        /// Backup name (use 'latest' for most recent)
        backup: String,
    },

    /// Delete a backup
    Delete {
        /// Backup name (use 'latest' for most recent)
        backup: String,
    },

    /// Delete all but the most recent backups
    Prune {
        /// Number of backups to keep (defaults to the retention setting)
        #[arg(short, long)]
        keep: Option<u32>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub async fn handle_backup_command(
    service: &BackupService,
    cmd: BackupCommands,
    retention: Option<u32>,
    json: bool,
) -> Result<(), CommandError> {
    match cmd {
        BackupCommands::Create { reason } => {
            let response = service.handle(BackupRequest::Create { reason }).await?;
            if json {
                return print_json(&response);
            }
            if let BackupResponse::Created { path } = &response {
                println!("Backup created: {}", path);
                println!(
                    "Location: {}",
                    service.config().backup_dir().join(path).display()
                );
            }
        }

        BackupCommands::List { verbose } => {
            let response = service.handle(BackupRequest::List).await?;
            if json {
                return print_json(&response);
            }
            if let BackupResponse::Listed { backups } = &response {
                if backups.is_empty() {
                    println!("No backups found.");
                    println!("Create one with: snapkeep create");
                } else if verbose {
                    for backup in backups {
                        println!("{}", format_backup_details(backup));
                    }
                    println!("Total: {} backup(s)", backups.len());
                } else {
                    println!("{}", format_backup_list(backups, chrono::Utc::now()));
                }
            }
        }

        BackupCommands::Info { backup } => {
            let entry = resolve_backup(service, &backup).await?;
            if json {
                return print_json(&entry);
            }
            println!("{}", format_backup_details(&entry));
        }

        BackupCommands::Size { backup } => {
            let name = resolve_backup(service, &backup).await?.name;
            let response = service.handle(BackupRequest::Size { name: name.clone() }).await?;
            if json {
                return print_json(&response);
            }
            if let BackupResponse::Size { size } = response {
                println!("{}: {} ({} bytes)", name, format_size(size), size);
            }
        }

        BackupCommands::Delete { backup } => {
            let name = resolve_name(service, &backup).await?;
            let response = service.handle(BackupRequest::Delete { name: name.clone() }).await?;
            if json {
                return print_json(&response);
            }
            println!("Deleted backup: {}", name);
        }

        BackupCommands::Prune { keep, force } => {
            let Some(keep) = keep.or(retention) else {
                return Err(BackupError::Config(
                    "No retention limit configured; pass --keep".into(),
                )
                .into());
            };
            let keep = keep as usize;

            if !force {
                let count = match service.handle(BackupRequest::List).await? {
                    BackupResponse::Listed { backups } => backups.len(),
                    _ => 0,
                };
                let to_delete = count.saturating_sub(keep);
                if json {
                    return print_json(&serde_json::json!({ "would_delete": to_delete }));
                }
                if to_delete == 0 {
                    println!("No backups to prune ({} present, keeping {}).", count, keep);
                } else {
                    println!("{} of {} backup(s) would be deleted.", to_delete, count);
                    println!("To delete them, run again with --force flag:");
                    println!("  snapkeep prune --keep {} --force", keep);
                }
                return Ok(());
            }

            let response = service.handle(BackupRequest::Prune { keep }).await?;
            if json {
                return print_json(&response);
            }
            if let BackupResponse::Pruned { deleted } = response {
                println!("Deleted {} backup(s).", deleted.len());
            }
        }
    }

    Ok(())
}

/// Resolve a backup identifier to an entry, accepting `latest`
async fn resolve_backup(service: &BackupService, backup: &str) -> Result<BackupEntry, CommandError> {
    let manager = service.manager().await;
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .latest_backup()
            .await?
            .ok_or_else(|| BackupError::not_found("latest").into());
    }
    Ok(manager.get_backup(backup).await?)
}

/// Resolve `latest` to a concrete name; other names pass through unchecked
async fn resolve_name(service: &BackupService, backup: &str) -> Result<String, CommandError> {
    if backup.eq_ignore_ascii_case("latest") {
        return Ok(resolve_backup(service, backup).await?.name);
    }
    Ok(backup.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let json = serde_json::to_string_pretty(value).map_err(BackupError::from)?;
    println!("{}", json);
    Ok(())
}

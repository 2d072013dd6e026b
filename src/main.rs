use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snapkeep::backup::BackupConfig;
use snapkeep::cli::{handle_backup_command, BackupCommands};
use snapkeep::command::BackupService;
use snapkeep::config::{SnapkeepPaths, Settings};

#[derive(Parser)]
#[command(
    name = "snapkeep",
    version,
    about = "Atomic snapshot backups of application settings and database",
    long_about = "snapkeep captures the application's settings file and database \
                  into timestamped backup entries. Entries appear and disappear \
                  atomically, so a listing never shows a half-written backup."
)]
struct Cli {
    /// Settings file to back up
    #[arg(long, global = true, env = "SNAPKEEP_SETTINGS_FILE")]
    settings_file: Option<PathBuf>,

    /// Database file or directory to back up
    #[arg(long, global = true, env = "SNAPKEEP_DATABASE_FILE")]
    database_file: Option<PathBuf>,

    /// Directory holding the backups
    #[arg(long, global = true, env = "SNAPKEEP_BACKUP_DIR")]
    backup_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (overridden by SNAPKEEP_LOG)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Backup(BackupCommands),

    /// Show current configuration and paths, optionally updating preferences
    Config {
        /// Keep at most N backups, pruning older ones after each create
        #[arg(long, value_name = "N", conflicts_with = "keep_all")]
        keep: Option<u32>,

        /// Remove the retention limit and keep every backup
        #[arg(long)]
        keep_all: bool,

        /// Reason recorded on backups created without one
        #[arg(long)]
        default_reason: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let paths = SnapkeepPaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;

    let config = BackupConfig::new(
        cli.settings_file.unwrap_or_else(|| paths.settings_file()),
        cli.database_file.unwrap_or_else(|| paths.database_file()),
        cli.backup_dir.unwrap_or_else(|| paths.backup_dir()),
    );

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            let service = BackupService::new(config)
                .with_default_reason(settings.default_reason.clone())
                .with_max_count(settings.backup_retention.max_count);

            if let Err(err) = handle_backup_command(
                &service,
                cmd,
                settings.backup_retention.max_count,
                cli.json,
            )
            .await
            {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&err)?);
                }
                return Err(anyhow::anyhow!("{} ({})", err, err.kind));
            }
        }
        Some(Commands::Config {
            keep,
            keep_all,
            default_reason,
        }) => {
            if keep.is_some() || keep_all || default_reason.is_some() {
                if let Some(max) = keep {
                    settings.backup_retention.max_count = Some(max);
                }
                if keep_all {
                    settings.backup_retention.max_count = None;
                }
                if let Some(reason) = default_reason {
                    let reason = reason.trim();
                    if reason.is_empty() {
                        bail!("Default reason cannot be blank");
                    }
                    settings.default_reason = reason.to_string();
                }
                settings.save(&paths)?;
                println!("Preferences saved to {}", paths.preferences_file().display());
                println!();
            }

            println!("snapkeep Configuration");
            println!("======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Settings file:    {}", config.settings_file().display());
            println!("Database file:    {}", config.database_file().display());
            println!("Backup directory: {}", config.backup_dir().display());
            println!();
            println!("Preferences:");
            println!("  Default reason: {}", settings.default_reason);
            match settings.backup_retention.max_count {
                Some(max) => println!("  Retention:      keep {} backup(s)", max),
                None => println!("  Retention:      keep all backups"),
            }
        }
        None => {
            println!("snapkeep - atomic snapshot backups");
            println!();
            println!("Run 'snapkeep --help' for usage information.");
        }
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SNAPKEEP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

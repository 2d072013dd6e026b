//! Backup manager for snapkeep
//!
//! Creates, enumerates, sizes and deletes snapshot entries of the application's
//! settings file and database.
//!
//! Entries become visible atomically: a backup is assembled under a reserved
//! temporary name and renamed to its final name only once every file has been
//! copied and synced, and a deletion renames the entry into the trash before
//! removing its files. A concurrent lister therefore never sees a half-written
//! or half-deleted entry. Mutating operations are additionally serialized with
//! each other: within a process by an async mutex, across processes by the
//! store's lock file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::error::{BackupError, BackupResult};
use crate::store::fs_ops::{copy_recursive, read_json, write_json_atomic};
use crate::store::{next_name, SnapshotStore, StoredEntry, MANIFEST_FILE};

use super::entry::{BackupEntry, CapturedFile, EntryManifest, DEFAULT_REASON};

/// Entry subdirectory holding the settings snapshot
const SETTINGS_DIR: &str = "settings";

/// Entry subdirectory holding the database snapshot
const DATABASE_DIR: &str = "database";

/// Suffixes of files that belong to a database file and must be captured with it
const DATABASE_SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Source and destination locations, fixed for the manager's lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    settings_file: PathBuf,
    database_file: PathBuf,
    backup_dir: PathBuf,
}

impl BackupConfig {
    pub fn new(
        settings_file: impl Into<PathBuf>,
        database_file: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings_file: settings_file.into(),
            database_file: database_file.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Get the settings file that gets backed up
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    /// Get the database file (or directory) that gets backed up
    pub fn database_file(&self) -> &Path {
        &self.database_file
    }

    /// Get the snapshot store root
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }
}

#[derive(Debug)]
enum InitState {
    Uninitialized,
    Ready,
    Failed(String),
}

/// Manages backup creation, enumeration and deletion
pub struct BackupManager {
    config: BackupConfig,
    store: SnapshotStore,
    state: Mutex<InitState>,
    /// Held for the whole of every create/delete/prune, including the blocking
    /// filesystem work, so it outlives a dropped caller future
    mutation: Arc<Mutex<()>>,
}

impl BackupManager {
    /// Create a new BackupManager; performs no I/O
    pub fn new(config: BackupConfig) -> Self {
        let store = SnapshotStore::new(config.backup_dir.clone());
        Self {
            config,
            store,
            state: Mutex::new(InitState::Uninitialized),
            mutation: Arc::new(Mutex::new(())),
        }
    }

    /// Get the configured locations
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Get the underlying snapshot store
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Whether initialization has completed successfully
    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.lock().await, InitState::Ready)
    }

    /// The error message of the last failed initialization, if any
    pub async fn last_init_error(&self) -> Option<String> {
        match &*self.state.lock().await {
            InitState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Ensure the store root exists and is writable, and clear out artifacts
    /// of interrupted operations
    ///
    /// Succeeds at most once; afterwards it is a no-op. After a failure the
    /// next call (including the implicit one at the start of every mutating
    /// operation) tries again.
    pub async fn initialize(&self) -> BackupResult<()> {
        let mut state = self.state.lock().await;
        if matches!(*state, InitState::Ready) {
            return Ok(());
        }

        let guard = self.mutation.clone().lock_owned().await;
        let store = self.store.clone();
        let result = run_blocking(move || {
            let _guard = guard;
            store.ensure_root()?;
            let _lock = store.lock()?;
            store.sweep_orphans()
        })
        .await;

        match result {
            Ok(removed) => {
                if !removed.is_empty() {
                    info!(count = removed.len(), "Removed orphaned backup artifacts");
                }
                info!(root = %self.store.root().display(), "Backup manager ready");
                *state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Backup manager initialization failed");
                *state = InitState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Snapshot the settings file and database into a new entry
    ///
    /// `reason` defaults to `"manual"` when omitted or blank.
    pub async fn create_backup(&self, reason: Option<&str>) -> BackupResult<BackupEntry> {
        let reason = match reason.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => DEFAULT_REASON.to_string(),
        };

        let guard = self.lock_for_mutation().await?;
        let store = self.store.clone();
        let config = self.config.clone();

        let entry = run_blocking(move || {
            let _guard = guard;
            let _lock = store.lock()?;
            capture_entry(&store, &config, reason)
        })
        .await?;

        info!(
            name = %entry.name,
            reason = %entry.reason,
            size_bytes = entry.size_bytes,
            "Backup created"
        );
        Ok(entry)
    }

    /// Create a backup, then delete the oldest entries beyond `max_count`
    ///
    /// Returns the new entry and the names of pruned entries. The new entry is
    /// never pruned, even with a `max_count` of 0. Once the entry exists the
    /// call succeeds: a failed prune is logged and reported as nothing pruned.
    pub async fn create_backup_with_retention(
        &self,
        reason: Option<&str>,
        max_count: Option<u32>,
    ) -> BackupResult<(BackupEntry, Vec<String>)> {
        let entry = self.create_backup(reason).await?;
        let pruned = match max_count {
            Some(keep) => {
                let result = self.prune(keep as usize, Some(entry.name.clone())).await;
                settle_retention(&entry, result)
            }
            None => Vec::new(),
        };
        Ok((entry, pruned))
    }

    /// List all promoted backups, most recent first
    pub async fn list_backups(&self) -> BackupResult<Vec<BackupEntry>> {
        let store = self.store.clone();
        run_blocking(move || {
            let entries: Vec<BackupEntry> = store
                .list_entries()?
                .iter()
                .filter_map(|stored| describe(&store, stored))
                .collect();
            Ok(entries)
        })
        .await
    }

    /// Get a specific backup by name
    pub async fn get_backup(&self, name: &str) -> BackupResult<BackupEntry> {
        let store = self.store.clone();
        let name = name.to_string();
        run_blocking(move || {
            let stored = store.lookup(&name)?;
            describe(&store, &stored).ok_or_else(|| BackupError::not_found(name))
        })
        .await
    }

    /// Get the most recent backup
    pub async fn latest_backup(&self) -> BackupResult<Option<BackupEntry>> {
        Ok(self.list_backups().await?.into_iter().next())
    }

    /// Sum of the sizes of every file captured in the named backup
    pub async fn get_backup_size(&self, name: &str) -> BackupResult<u64> {
        let store = self.store.clone();
        let name = name.to_string();
        run_blocking(move || {
            let stored = store.lookup(&name)?;
            store.entry_size(&stored).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound && !stored.path.exists() {
                    BackupError::not_found(name)
                } else {
                    BackupError::StorageUnavailable(format!(
                        "Failed to compute size of backup {}: {}",
                        name, e
                    ))
                }
            })
        })
        .await
    }

    /// Delete the named backup and all its files
    pub async fn delete_backup(&self, name: &str) -> BackupResult<()> {
        let guard = self.lock_for_mutation().await?;
        let store = self.store.clone();
        let target = name.to_string();

        run_blocking(move || {
            let _guard = guard;
            let _lock = store.lock()?;
            let stored = store.lookup(&target)?;
            remove_entry(&store, &stored)
        })
        .await?;

        info!(name = %name, "Backup deleted");
        Ok(())
    }

    /// Delete every backup beyond the `keep` most recent, returning the names
    /// of the deleted entries, oldest last
    pub async fn prune_backups(&self, keep: usize) -> BackupResult<Vec<String>> {
        self.prune(keep, None).await
    }

    async fn prune(&self, keep: usize, protected: Option<String>) -> BackupResult<Vec<String>> {
        let guard = self.lock_for_mutation().await?;
        let store = self.store.clone();

        let deleted = run_blocking(move || {
            let _guard = guard;
            let _lock = store.lock()?;
            let mut deleted = Vec::new();
            for stored in store.list_entries()?.into_iter().skip(keep) {
                let name = stored.name.to_string();
                if protected.as_deref() == Some(name.as_str()) {
                    continue;
                }
                match remove_entry(&store, &stored) {
                    Ok(()) => deleted.push(name),
                    Err(e) if e.is_not_found() => {
                        debug!(name = %name, "Backup already gone while pruning")
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(deleted)
        })
        .await?;

        if !deleted.is_empty() {
            info!(count = deleted.len(), keep, "Pruned old backups");
        }
        Ok(deleted)
    }

    /// Re-attempt setup if needed, then take the mutation lock
    async fn lock_for_mutation(&self) -> BackupResult<OwnedMutexGuard<()>> {
        self.initialize().await?;
        Ok(self.mutation.clone().lock_owned().await)
    }
}

/// Run filesystem work on the blocking pool
async fn run_blocking<T, F>(f: F) -> BackupResult<T>
where
    F: FnOnce() -> BackupResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackupError::StorageUnavailable(format!("Backup task failed: {}", e)))?
}

/// Log a failed retention prune; the backup it followed stands regardless
fn settle_retention(entry: &BackupEntry, result: BackupResult<Vec<String>>) -> Vec<String> {
    match result {
        Ok(pruned) => pruned,
        Err(e) => {
            warn!(
                name = %entry.name,
                error = %e,
                "Backup created but pruning old backups failed"
            );
            Vec::new()
        }
    }
}

/// Copy both sources into a temporary entry and promote it
///
/// Callers must hold the store lock.
fn capture_entry(
    store: &SnapshotStore,
    config: &BackupConfig,
    reason: String,
) -> BackupResult<BackupEntry> {
    check_source(config.settings_file())?;
    check_source(config.database_file())?;

    let mut name = store.allocate_name(Utc::now())?;

    // Dropping `pending` on any early return removes the temporary entry
    let mut pending = store.begin_entry()?;

    let mut files = capture_artifact(config.settings_file(), &pending.path().join(SETTINGS_DIR))?;
    let database_dir = pending.path().join(DATABASE_DIR);
    files.extend(capture_artifact(config.database_file(), &database_dir)?);
    for sidecar in database_sidecars(config.database_file()) {
        files.extend(capture_artifact(&sidecar, &database_dir)?);
    }

    loop {
        let manifest = EntryManifest::new(&name, reason.clone(), files.clone());
        write_json_atomic(pending.path().join(MANIFEST_FILE), &manifest)
            .map_err(|e| BackupError::CopyFailed(format!("Failed to write manifest: {}", e)))?;

        match pending.try_promote(&name)? {
            Some(path) => {
                let stored = StoredEntry { name, path };
                return Ok(BackupEntry::from_manifest(&stored, manifest));
            }
            None => {
                // Only a writer ignoring the store lock can get here
                warn!(name = %name, "Backup name already taken, trying the next one");
                name = next_name(&name)?;
            }
        }
    }
}

fn check_source(path: &Path) -> BackupResult<()> {
    match fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackupError::source_missing(path)),
        Err(e) => Err(BackupError::CopyFailed(format!(
            "Failed to access {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Copy a file or directory into `dest_dir`, keeping its file name
fn capture_artifact(source: &Path, dest_dir: &Path) -> BackupResult<Vec<CapturedFile>> {
    let file_name = source.file_name().ok_or_else(|| {
        BackupError::CopyFailed(format!("{} has no file name", source.display()))
    })?;

    fs::create_dir_all(dest_dir).map_err(|e| {
        BackupError::CopyFailed(format!("Failed to create {}: {}", dest_dir.display(), e))
    })?;

    let copied = copy_recursive(source, &dest_dir.join(file_name)).map_err(|e| {
        BackupError::CopyFailed(format!("Failed to copy {}: {}", source.display(), e))
    })?;

    // Relative to the entry root, e.g. database/app.db
    let prefix = dest_dir
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(file_name);
    Ok(copied
        .into_iter()
        .map(|(relative, size)| {
            let path = if relative.as_os_str().is_empty() {
                prefix.clone()
            } else {
                prefix.join(relative)
            };
            CapturedFile::new(&path, size)
        })
        .collect())
}

/// Write-ahead log and journal files sitting next to a database file
fn database_sidecars(database: &Path) -> Vec<PathBuf> {
    if database.is_dir() {
        return Vec::new();
    }

    let Some(file_name) = database.file_name() else {
        return Vec::new();
    };

    DATABASE_SIDECAR_SUFFIXES
        .iter()
        .map(|suffix| {
            let mut name = file_name.to_os_string();
            name.push(suffix);
            database.with_file_name(name)
        })
        .filter(|path| path.exists())
        .collect()
}

/// Describe a stored entry, or None if it vanished while being read
fn describe(store: &SnapshotStore, stored: &StoredEntry) -> Option<BackupEntry> {
    match read_json::<EntryManifest, _>(stored.path.join(MANIFEST_FILE)) {
        Ok(manifest) => Some(BackupEntry::from_manifest(stored, manifest)),
        Err(_) if !stored.path.exists() => {
            debug!(name = %stored.name, "Backup disappeared during listing");
            None
        }
        Err(e) => {
            warn!(name = %stored.name, error = %e, "Backup manifest unreadable");
            match store.entry_size(stored) {
                Ok(size) => Some(BackupEntry::without_manifest(stored, size)),
                Err(_) if !stored.path.exists() => None,
                Err(e) => {
                    warn!(name = %stored.name, error = %e, "Failed to size backup");
                    Some(BackupEntry::without_manifest(stored, 0))
                }
            }
        }
    }
}

/// Withdraw an entry from view, then remove its files
///
/// Once the rename has happened the entry counts as deleted; leftover trash is
/// swept on the next initialization.
fn remove_entry(store: &SnapshotStore, stored: &StoredEntry) -> BackupResult<()> {
    let trash = store.withdraw(stored)?;
    if let Err(e) = fs::remove_dir_all(&trash) {
        warn!(
            name = %stored.name,
            trash = %trash.display(),
            error = %e,
            "Failed to remove withdrawn backup files"
        );
    }
    Ok(())
}

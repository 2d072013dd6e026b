//! Snapshot store
//!
//! Directory-backed layout of backup entries. The store root holds one
//! subdirectory per promoted entry, named by [`EntryName`]. Entries under
//! construction or deletion use reserved dot-prefixed names and are invisible
//! to enumeration, so a reader only ever sees fully promoted entries.
//!
//! The store keeps no state beyond its root path; reads are safe to run
//! concurrently with each other and with a single mutator. Mutators, in this
//! process or another, serialize on [`StoreLock`].

pub mod fs_ops;
pub mod lock;
pub mod naming;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{BackupError, BackupResult};

pub use lock::{StoreLock, LOCK_FILE};
pub use naming::EntryName;

/// File holding an entry's metadata; not counted as captured data
pub const MANIFEST_FILE: &str = "manifest.json";

/// A promoted entry found in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub name: EntryName,
    pub path: PathBuf,
}

/// Directory-backed collection of backup entries
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `root`; nothing is touched on disk
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a promoted entry
    pub fn entry_path(&self, name: &EntryName) -> PathBuf {
        self.root.join(name.to_string())
    }

    /// Create the root if needed and confirm it accepts writes
    pub fn ensure_root(&self) -> BackupResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            BackupError::StorageUnavailable(format!(
                "Failed to create backup directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let probe = self.root.join(naming::temp_name());
        fs::write(&probe, b"").map_err(|e| {
            BackupError::StorageUnavailable(format!(
                "Backup directory {} is not writable: {}",
                self.root.display(),
                e
            ))
        })?;
        if let Err(e) = fs::remove_file(&probe) {
            warn!(path = %probe.display(), error = %e, "Failed to remove write probe");
        }

        Ok(())
    }

    /// Take the cross-process mutation lock on the root
    pub fn lock(&self) -> BackupResult<StoreLock> {
        StoreLock::acquire(&self.root)
    }

    /// Remove in-progress and trash artifacts left behind by an interrupted
    /// process, returning the names removed
    ///
    /// Callers must hold the [`StoreLock`]; every live create or delete holds
    /// it too, so anything reserved found here belongs to a dead process.
    pub fn sweep_orphans(&self) -> BackupResult<Vec<String>> {
        let mut removed = Vec::new();

        for dir_entry in self.read_root()? {
            let dir_entry = dir_entry.map_err(|e| {
                BackupError::StorageUnavailable(format!("Failed to read directory entry: {}", e))
            })?;
            let name = dir_entry.file_name().to_string_lossy().to_string();
            if !naming::is_reserved(&name) {
                continue;
            }

            let path = dir_entry.path();
            let result = match dir_entry.file_type() {
                Ok(ft) if ft.is_dir() => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };
            match result {
                Ok(()) => removed.push(name),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove orphaned artifact"),
            }
        }

        Ok(removed)
    }

    /// Enumerate promoted entries, most recent first
    ///
    /// A missing root is an empty store.
    pub fn list_entries(&self) -> BackupResult<Vec<StoredEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for dir_entry in self.read_root()? {
            let dir_entry = match dir_entry {
                Ok(dir_entry) => dir_entry,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let file_name = dir_entry.file_name();
            let Some(name) = file_name.to_str().and_then(EntryName::parse) else {
                continue;
            };
            if !dir_entry.file_type().map_or(false, |ft| ft.is_dir()) {
                continue;
            }

            entries.push(StoredEntry {
                name,
                path: dir_entry.path(),
            });
        }

        entries.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(entries)
    }

    /// Find a promoted entry by its external name
    pub fn lookup(&self, name: &str) -> BackupResult<StoredEntry> {
        let parsed = EntryName::parse(name).ok_or_else(|| BackupError::not_found(name))?;
        let path = self.entry_path(&parsed);

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => Ok(StoredEntry { name: parsed, path }),
            Ok(_) => Err(BackupError::not_found(name)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackupError::not_found(name)),
            Err(e) => Err(BackupError::StorageUnavailable(format!(
                "Failed to access backup {}: {}",
                name, e
            ))),
        }
    }

    /// Sum of the captured file sizes of an entry (the manifest is excluded)
    pub fn entry_size(&self, entry: &StoredEntry) -> io::Result<u64> {
        let mut total = 0;
        for child in fs::read_dir(&entry.path)? {
            let child = child?;
            if child.file_name() == MANIFEST_FILE {
                continue;
            }
            total += fs_ops::dir_size(&child.path())?;
        }
        Ok(total)
    }

    /// Pick the final name for a backup taken at `now`
    ///
    /// Names only move forward: when the newest stored entry is not older
    /// than `now` (same millisecond, or a clock step backwards) the new name
    /// reuses its timestamp with the next sequence number.
    ///
    /// Callers must hold the [`StoreLock`] until the name is promoted.
    pub fn allocate_name(&self, now: DateTime<Utc>) -> BackupResult<EntryName> {
        let mut candidate = EntryName::at(now);
        if let Some(newest) = self.list_entries()?.first() {
            if newest.name >= candidate {
                candidate = next_name(&newest.name)?;
            }
        }

        while self.entry_path(&candidate).exists() {
            candidate = next_name(&candidate)?;
        }
        Ok(candidate)
    }

    /// Start a new in-progress entry
    ///
    /// The returned guard removes the directory when dropped unless it has been
    /// promoted.
    pub fn begin_entry(&self) -> BackupResult<PendingEntry> {
        let path = self.root.join(naming::temp_name());
        fs::create_dir(&path).map_err(|e| {
            BackupError::StorageUnavailable(format!(
                "Failed to create temporary entry {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(PendingEntry {
            root: self.root.clone(),
            path,
            promoted: false,
        })
    }

    /// Atomically withdraw an entry from view by renaming it into the trash,
    /// returning the trash path
    pub fn withdraw(&self, entry: &StoredEntry) -> BackupResult<PathBuf> {
        let trash = self.root.join(naming::trash_name());
        fs::rename(&entry.path, &trash).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BackupError::not_found(entry.name.to_string())
            } else {
                BackupError::StorageUnavailable(format!(
                    "Failed to withdraw backup {}: {}",
                    entry.name, e
                ))
            }
        })?;

        if let Err(e) = fs_ops::sync_dir(&self.root) {
            warn!(error = %e, "Failed to sync backup directory after withdrawal");
        }
        Ok(trash)
    }

    fn read_root(&self) -> BackupResult<fs::ReadDir> {
        fs::read_dir(&self.root).map_err(|e| {
            BackupError::StorageUnavailable(format!(
                "Failed to read backup directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }
}

/// An entry under construction
///
/// Lives under a reserved name until [`PendingEntry::promote`] renames it to its
/// final name. Dropping an unpromoted entry deletes it.
#[derive(Debug)]
pub struct PendingEntry {
    root: PathBuf,
    path: PathBuf,
    promoted: bool,
}

impl PendingEntry {
    /// Directory the entry's files are written into
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make the entry visible under `name`, failing if the name is taken
    pub fn promote(mut self, name: &EntryName) -> BackupResult<PathBuf> {
        self.try_promote(name)?.ok_or_else(|| {
            BackupError::StorageUnavailable(format!("Backup {} already exists", name))
        })
    }

    /// Make the entry visible under `name`
    ///
    /// Returns `Ok(None)` and leaves the entry pending when another entry
    /// already holds the name. The directory contents are synced first so the
    /// rename never exposes an entry whose files are still in flight.
    pub fn try_promote(&mut self, name: &EntryName) -> BackupResult<Option<PathBuf>> {
        fs_ops::sync_dir(&self.path).map_err(|e| {
            BackupError::CopyFailed(format!("Failed to sync temporary entry: {}", e))
        })?;

        let final_path = self.root.join(name.to_string());
        if final_path.exists() {
            return Ok(None);
        }
        if let Err(e) = fs::rename(&self.path, &final_path) {
            // Lost a race for the name (EEXIST or ENOTEMPTY depending on platform)
            if final_path.exists() && self.path.exists() {
                return Ok(None);
            }
            return Err(BackupError::StorageUnavailable(format!(
                "Failed to promote backup {}: {}",
                name, e
            )));
        }
        self.promoted = true;

        if let Err(e) = fs_ops::sync_dir(&self.root) {
            warn!(error = %e, "Failed to sync backup directory after promotion");
        }
        Ok(Some(final_path))
    }
}

/// The name after `name`, or an error once the sequence space is exhausted
pub fn next_name(name: &EntryName) -> BackupResult<EntryName> {
    name.successor().ok_or_else(|| {
        BackupError::StorageUnavailable(format!("Backup name sequence exhausted after {}", name))
    })
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        if self.promoted {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Rolled back temporary entry"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to roll back temporary entry"
            ),
        }
    }
}

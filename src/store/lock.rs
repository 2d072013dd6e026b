//! Cross-process lock over a store root
//!
//! Every process that mutates the store (create, delete, prune, orphan sweep)
//! holds an exclusive advisory lock on `<root>/.snapkeep.lock` for the whole of
//! the operation. Reserved `.tmp-`/`.trash-` entries therefore only outlive
//! their lock holder when that process died, which is what makes sweeping
//! them safe. The lock is released on drop, or by the OS when the process
//! exits.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{BackupError, BackupResult};

/// Name of the lock file inside the store root
pub const LOCK_FILE: &str = ".snapkeep.lock";

/// Exclusive lock on a store root, released on drop
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until the exclusive lock on `root` is held
    ///
    /// The root must already exist.
    pub fn acquire(root: &Path) -> BackupResult<Self> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                BackupError::StorageUnavailable(format!(
                    "Failed to open lock file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        file.lock_exclusive().map_err(|e| {
            BackupError::StorageUnavailable(format!(
                "Failed to lock backup directory {}: {}",
                root.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "Acquired store lock");

        Ok(Self { file, path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Closing the file releases the lock even if this fails
        let _ = self.file.unlock();
    }
}

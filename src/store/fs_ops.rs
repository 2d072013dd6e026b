//! File I/O utilities for the snapshot store
//!
//! Copies are synced to disk before they count as captured, and JSON documents
//! are written via temp-file-then-rename so a crash never leaves a torn file.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

/// Read JSON from a file
pub fn read_json<T, P>(path: P) -> io::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Write JSON to a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> io::Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Temp file must live in the same directory for the rename to be atomic
    let temp_path = path.with_extension("json.tmp");

    let result = (|| {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Copy a single file and sync the copy to disk, returning the bytes copied
pub fn copy_file_synced(from: &Path, to: &Path) -> io::Result<u64> {
    let bytes = fs::copy(from, to)?;
    File::open(to)?.sync_all()?;
    Ok(bytes)
}

/// Recursively copy `from` into `to`, returning every copied file as
/// (path relative to `to`, size)
///
/// Symlinks are followed; a dangling link fails the copy.
pub fn copy_recursive(from: &Path, to: &Path) -> io::Result<Vec<(PathBuf, u64)>> {
    let mut copied = Vec::new();
    copy_recursive_into(from, to, Path::new(""), &mut copied)?;
    Ok(copied)
}

fn copy_recursive_into(
    from: &Path,
    to: &Path,
    relative: &Path,
    copied: &mut Vec<(PathBuf, u64)>,
) -> io::Result<()> {
    let metadata = fs::metadata(from)?;

    if metadata.is_dir() {
        fs::create_dir_all(to)?;
        let mut children: Vec<_> = fs::read_dir(from)?.collect::<io::Result<_>>()?;
        children.sort_by_key(|entry| entry.file_name());
        for child in children {
            let name = child.file_name();
            copy_recursive_into(&child.path(), &to.join(&name), &relative.join(&name), copied)?;
        }
        sync_dir(to)?;
    } else {
        let bytes = copy_file_synced(from, to)?;
        copied.push((relative.to_path_buf(), bytes));
    }

    Ok(())
}

/// Total size in bytes of every regular file under `path`
///
/// Symlinks are not followed.
pub fn dir_size(path: &Path) -> io::Result<u64> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(if metadata.is_file() { metadata.len() } else { 0 });
    }

    let mut total = 0;
    for entry in fs::read_dir(path)? {
        total += dir_size(&entry?.path())?;
    }
    Ok(total)
}

/// Flush a directory's entries to disk so renames inside it are durable
#[cfg(unix)]
pub fn sync_dir(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

/// Directory handles cannot be synced on this platform
#[cfg(not(unix))]
pub fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

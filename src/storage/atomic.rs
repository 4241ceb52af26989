//! Crash-safe file replacement
//!
//! Files are replaced by writing a sibling `<name>.tmp`, syncing it and
//! renaming it over the target, so the target path only ever holds a
//! complete file.

use crate::storage::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Returns the temporary sibling used while replacing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Creates the directory containing `path` if it does not exist yet
pub fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Atomically replaces the contents of `path` with `bytes`
///
/// A stale temporary file left by an earlier crash is simply overwritten.
/// On failure the temporary file is removed and the target is untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    ensure_parent_dir(path)?;

    let tmp = temp_path(path);
    let result = write_synced(&tmp, bytes)
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e)));

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
        return result;
    }

    sync_parent_dir(path);
    Ok(())
}

fn write_synced(tmp: &Path, bytes: &[u8]) -> StorageResult<()> {
    let mut file = File::create(tmp).map_err(|e| StorageError::io(tmp, e))?;
    file.write_all(bytes).map_err(|e| StorageError::io(tmp, e))?;
    file.sync_all().map_err(|e| StorageError::io(tmp, e))
}

/// Makes a completed rename durable; best effort
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent) {
        if let Err(e) = dir.sync_all() {
            tracing::debug!("Failed to sync {}: {}", parent.display(), e);
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

/// Serializes `value` as pretty JSON and atomically writes it to `path`
pub fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

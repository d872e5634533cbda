//! File persistence helpers.
//!
//! Every write goes to a hidden sibling temp file first and is then renamed
//! over the target, so a reader never observes a half-written cache file.
//! Readers still treat undecodable content as a miss.

use serde::{Serialize, de::DeserializeOwned};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default cache base directory.
///
/// - macOS: `~/Library/Caches/hostfetch`
/// - Linux: `~/.cache/hostfetch`
/// - Windows: `%LOCALAPPDATA%\hostfetch`
pub fn default_cache_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Caches").join("hostfetch"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|c| c.join("hostfetch"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets restrictive file permissions (0o600) on Unix systems.
///
/// Cached device data may include community strings or agent output that
/// should only be readable by the owner.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(path).await?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Temp file used while replacing `path`: `.<name>.tmp` in the same
/// directory, so directory scans can skip it by its leading dot.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
    }
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to `path` atomically (temp file + rename).
///
/// Creates parent directories if they don't exist.
pub async fn save_bytes(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let temp = temp_path(path);
    tokio::fs::write(&temp, bytes).await?;
    set_restrictive_permissions(&temp).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }

    debug!(path = %path.display(), len = bytes.len(), "File saved");
    Ok(())
}

/// Saves data as compact JSON, atomically.
pub async fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec(data)?;
    save_bytes(path, &json).await
}

/// Loads raw bytes from a file.
pub async fn load_bytes(path: &Path) -> Result<Vec<u8>, StoreError> {
    Ok(tokio::fs::read(path).await?)
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read(path).await?;
    let data = serde_json::from_slice(&content)?;
    debug!(path = %path.display(), "JSON file loaded");
    Ok(data)
}

/// Loads JSON, treating a missing file as `None` and a corrupt file as
/// `None` with a warning.
pub async fn load_json_or_miss<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match load_json(path).await {
        Ok(data) => Some(data),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable cache file");
            None
        }
    }
}

/// Ensures a directory exists.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}

/// Removes a directory and everything below it. Missing is fine.
pub async fn remove_dir(path: &Path) -> Result<(), StoreError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Directory removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Lists the regular, non-hidden files of a directory by name.
///
/// A missing directory yields an empty list.
pub async fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, StoreError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        files.push((name, entry.path()));
    }
    files.sort();
    Ok(files)
}

// ============================================================================
// Tests
// ============================================================================

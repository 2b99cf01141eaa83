//! File persistence helpers.
//!
//! Settings are small JSON documents written atomically with owner-only
//! permissions. Generated images are written once and never replaced.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::SettingsError;

/// How many numbered alternatives of a file name are tried.
const MAX_FILE_SUFFIX: u32 = 100;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the configuration directory (`<config dir>/genlog`).
///
/// - macOS: `~/Library/Application Support/genlog`
/// - Linux: `~/.config/genlog`
/// - Windows: `%APPDATA%\genlog`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("genlog"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the settings file path.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

/// Returns the directory generated images are saved to by default.
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("genlog"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// Permissions
// ============================================================================

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(mode);
    tokio::fs::set_permissions(path, perms).await?;
    debug!(path = %path.display(), mode = format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), SettingsError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Saves `data` as pretty JSON.
///
/// Missing parent directories are created owner-only (0700), the file is
/// written through a temp file plus rename, and ends up 0600 on Unix.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
            restrict(parent, 0o700).await?;
        }
    }

    let json = serde_json::to_string_pretty(data)?;
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, json.as_bytes()).await?;
    restrict(&staging, 0o600).await?;
    tokio::fs::rename(&staging, path).await?;

    debug!(path = %path.display(), bytes = json.len(), "Saved JSON");
    Ok(())
}

/// Loads a JSON document.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, SettingsError> {
    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "Loaded JSON");
    Ok(data)
}

/// Writes bytes to a new file, creating parent directories.
///
/// Fails if the file already exists.
pub async fn write_new_file(path: &Path, bytes: &[u8]) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

/// Writes bytes to `dir/name`, or to `name_1`, `name_2`, ... if that
/// file exists. Returns the path written.
pub async fn write_numbered_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, SettingsError> {
    // Only a collision on the file itself may move on to the next name.
    tokio::fs::create_dir_all(dir).await?;
    for n in 0..=MAX_FILE_SUFFIX {
        let path = dir.join(genlog_core::numbered_name(name, n));
        match write_new_file(&path, bytes).await {
            Ok(()) => return Ok(path),
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "File exists, trying next name");
            }
            Err(e) => return Err(e),
        }
    }
    Err(SettingsError::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free file name for {name} in {}", dir.display()),
    )))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_path() {
        assert!(default_settings_path().ends_with("genlog/settings.json"));
    }

    #[test]
    fn test_default_output_dir_not_empty() {
        assert!(!default_output_dir().as_os_str().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("conf").join("settings.json");
        save_json(&path, &serde_json::json!({"a": 1})).await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let dir_mode = tokio::fs::metadata(path.parent().unwrap())
            .await
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_new_file_refuses_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out").join("a.png");

        write_new_file(&path, b"one").await.unwrap();
        assert!(write_new_file(&path, b"two").await.is_err());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"one");
    }
}

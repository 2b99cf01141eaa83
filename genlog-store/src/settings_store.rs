//! User preferences store.
//!
//! Manages settings with persistence and change notification.

use genlog_core::{AccessPolicy, AspectRatio, LogTable, DEFAULT_TABLE_NAME};
use genlog_fetch::RetryStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::error::SettingsError;
use crate::persistence::{default_settings_path, load_json, save_json};

// ============================================================================
// Settings
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Drive folder holding the usage log and archived images.
    pub drive_folder_id: Option<String>,

    /// Name of the usage-log table.
    pub log_table_name: String,

    /// Upload generated images next to the log.
    pub archive_images: bool,

    /// Service-account key file. Falls back to the environment and then the
    /// keychain when unset.
    pub credentials_path: Option<PathBuf>,

    /// Vertex AI region.
    pub vertex_location: String,

    /// Imagen model id.
    pub imagen_model: String,

    /// Aspect ratio when the prompt carries no directive.
    pub default_aspect_ratio: AspectRatio,

    /// Add the lighting phrase unless told otherwise.
    pub brighten_by_default: bool,

    /// HTTP timeout in seconds.
    pub http_timeout_secs: u64,

    /// Attempts per log append.
    pub log_retry_attempts: u32,

    /// Where images are saved locally. `None` means the default output dir.
    pub output_dir: Option<PathBuf>,

    /// Users allowed to start a session. Empty admits anyone.
    pub allowed_users: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            drive_folder_id: None,
            log_table_name: DEFAULT_TABLE_NAME.to_string(),
            archive_images: true,
            credentials_path: None,
            vertex_location: genlog_fetch::google::DEFAULT_LOCATION.to_string(),
            imagen_model: genlog_fetch::google::DEFAULT_MODEL.to_string(),
            default_aspect_ratio: AspectRatio::default(),
            brighten_by_default: false,
            http_timeout_secs: 60,
            log_retry_attempts: 5,
            output_dir: None,
            allowed_users: Vec::new(),
        }
    }
}

/// Keys accepted by [`Settings::set`].
pub const SETTING_KEYS: &[&str] = &[
    "drive_folder_id",
    "log_table_name",
    "archive_images",
    "credentials_path",
    "vertex_location",
    "imagen_model",
    "default_aspect_ratio",
    "brighten_by_default",
    "http_timeout_secs",
    "log_retry_attempts",
    "output_dir",
    "allowed_users",
];

fn parse_bool(key: &str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(SettingsError::Invalid(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::Invalid(format!("{key}: expected a number, got {value:?}")))
}

/// Empty strings clear optional values.
fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn required(key: &str, value: &str) -> Result<String, SettingsError> {
    optional(value).ok_or_else(|| SettingsError::Invalid(format!("{key} cannot be empty")))
}

impl Settings {
    /// Sets one field from its textual form.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` for unknown keys or unparseable values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        match key {
            "drive_folder_id" => self.drive_folder_id = optional(value),
            "log_table_name" => self.log_table_name = required(key, value)?,
            "archive_images" => self.archive_images = parse_bool(key, value)?,
            "credentials_path" => self.credentials_path = optional(value).map(PathBuf::from),
            "vertex_location" => self.vertex_location = required(key, value)?,
            "imagen_model" => self.imagen_model = required(key, value)?,
            "default_aspect_ratio" => {
                self.default_aspect_ratio = value
                    .trim()
                    .parse()
                    .map_err(|e| SettingsError::Invalid(format!("{key}: {e}")))?;
            }
            "brighten_by_default" => self.brighten_by_default = parse_bool(key, value)?,
            "http_timeout_secs" => {
                let secs: u64 = parse_number(key, value)?;
                if secs == 0 {
                    return Err(SettingsError::Invalid(format!("{key} must be positive")));
                }
                self.http_timeout_secs = secs;
            }
            "log_retry_attempts" => self.log_retry_attempts = parse_number::<u32>(key, value)?.max(1),
            "output_dir" => self.output_dir = optional(value).map(PathBuf::from),
            "allowed_users" => {
                self.allowed_users = value
                    .split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            _ => {
                return Err(SettingsError::Invalid(format!(
                    "unknown key {key:?} (known: {})",
                    SETTING_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// The log table, once a Drive folder is configured.
    pub fn log_table(&self) -> Option<LogTable> {
        self.drive_folder_id
            .as_deref()
            .map(|folder| LogTable::new(&self.log_table_name, folder))
    }

    /// HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Retry strategy for log appends.
    pub fn log_retry(&self) -> RetryStrategy {
        RetryStrategy::new(self.log_retry_attempts)
    }

    /// Access policy with an optional shared passphrase.
    pub fn access_policy(&self, passphrase: Option<String>) -> AccessPolicy {
        let policy = AccessPolicy::open().with_allowed_users(self.allowed_users.clone());
        match passphrase {
            Some(p) => policy.with_passphrase(p),
            None => policy,
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store with change notifications.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
}

impl SettingsStore {
    /// Creates a store with default settings.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
        }
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path, falling back to defaults.
    pub async fn load(path: PathBuf) -> Self {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };
        Self::with_settings(path, settings)
    }

    /// Settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change();
    }

    /// Sets one key from its textual form.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` if the key or value is rejected; the
    /// settings are unchanged in that case.
    pub async fn set_key(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        {
            let mut settings = self.settings.write().await;
            let mut candidate = settings.clone();
            candidate.set(key, value)?;
            *settings = candidate;
        }
        debug!(key, "Setting changed");
        self.notify_change();
        Ok(())
    }

    /// Restores defaults.
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), SettingsError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        self.notify.send_modify(|version| *version += 1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_table_name, "usage_log.csv");
        assert_eq!(settings.vertex_location, "us-central1");
        assert_eq!(settings.imagen_model, "imagen-3.0-generate-002");
        assert!(settings.archive_images);
        assert!(settings.log_table().is_none());
    }

    #[test]
    fn test_set_known_keys() {
        let mut settings = Settings::default();
        settings.set("drive_folder_id", "abc123").unwrap();
        settings.set("archive_images", "off").unwrap();
        settings.set("default_aspect_ratio", "9:16").unwrap();
        settings.set("allowed_users", "sato, tanaka ,").unwrap();

        assert_eq!(settings.log_table().unwrap().container_id, "abc123");
        assert!(!settings.archive_images);
        assert_eq!(settings.default_aspect_ratio, AspectRatio::Portrait);
        assert_eq!(settings.allowed_users, vec!["sato", "tanaka"]);

        settings.set("drive_folder_id", "").unwrap();
        assert!(settings.drive_folder_id.is_none());
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(settings.set("no_such_key", "1").is_err());
        assert!(settings.set("archive_images", "maybe").is_err());
        assert!(settings.set("http_timeout_secs", "0").is_err());
        assert!(settings.set("log_table_name", "  ").is_err());
        assert!(settings.set("default_aspect_ratio", "2:1").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_access_policy() {
        let mut settings = Settings::default();
        settings.allowed_users = vec!["sato".into()];
        let policy = settings.access_policy(Some("pw".into()));
        assert_eq!(policy.allowed_users, vec!["sato"]);
        assert_eq!(policy.passphrase.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn test_store_set_key_notifies() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(temp_dir.path().join("settings.json"));
        let rx = store.subscribe();

        store.set_key("brighten_by_default", "true").await.unwrap();
        assert!(store.get().await.brighten_by_default);
        assert_eq!(*rx.borrow(), 1);

        assert!(store.set_key("http_timeout_secs", "soon").await.is_err());
        assert_eq!(*rx.borrow(), 1);
    }

    #[tokio::test]
    async fn test_store_save_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone());
        store.set_key("drive_folder_id", "folder-9").await.unwrap();
        store.save().await.unwrap();

        let reloaded = SettingsStore::load(path).await;
        assert_eq!(reloaded.get().await.drive_folder_id.as_deref(), Some("folder-9"));

        reloaded.reset().await;
        assert_eq!(reloaded.get().await, Settings::default());
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = SettingsStore::load(path).await;
        assert_eq!(store.get().await, Settings::default());
    }
}

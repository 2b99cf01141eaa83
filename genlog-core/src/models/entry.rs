//! Usage log entries and the table they are appended to.
//!
//! - [`LogEntry`] - One generation event
//! - [`LogTable`] - The append-only table, one named blob in one container

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::image::ImageFormat;

// ============================================================================
// Constants
// ============================================================================

/// Column header written as the first line of every log table.
pub const LOG_HEADER: [&str; 4] = ["Timestamp", "User", "ImageFile", "Prompt"];

/// Default blob name of the log table.
pub const DEFAULT_TABLE_NAME: &str = "usage_log.csv";

/// MIME type the log table is created with.
pub const TABLE_MIME_TYPE: &str = "text/csv";

// ============================================================================
// Log Entry
// ============================================================================

/// One record of the usage log.
///
/// Fields are private so an entry cannot change after construction. The
/// timestamp is truncated to whole seconds, which is the precision the table
/// stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    user: String,
    artifact_name: String,
    prompt: String,
}

impl LogEntry {
    /// Creates an entry.
    pub fn new(
        timestamp: DateTime<Utc>,
        user: impl Into<String>,
        artifact_name: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: truncate_to_seconds(timestamp),
            user: user.into(),
            artifact_name: artifact_name.into(),
            prompt: prompt.into(),
        }
    }

    /// Creates an entry whose artifact name is derived from the timestamp and user.
    pub fn for_artifact(
        timestamp: DateTime<Utc>,
        user: impl Into<String>,
        format: ImageFormat,
        prompt: impl Into<String>,
    ) -> Self {
        let user = user.into();
        let artifact_name = artifact_name(timestamp, &user, format);
        Self::new(timestamp, user, artifact_name, prompt)
    }

    /// Returns the entry with another artifact name.
    #[must_use]
    pub fn with_artifact_name(mut self, artifact_name: impl Into<String>) -> Self {
        self.artifact_name = artifact_name.into();
        self
    }

    /// When the event happened.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Timestamp as stored in the table (`2024-01-01T00:00:00Z`).
    pub fn timestamp_text(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Who generated the artifact.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// File name of the generated artifact.
    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    /// Prompt sent to the generator.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Builds the artifact file name `YYYYMMDD_HHMMSS_<user>.<ext>`.
///
/// Path separators in the user id are replaced so the name stays a single
/// path component.
pub fn artifact_name(timestamp: DateTime<Utc>, user: &str, format: ImageFormat) -> String {
    let safe_user: String = user
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!(
        "{}_{}.{}",
        timestamp.format("%Y%m%d_%H%M%S"),
        safe_user,
        format.extension()
    )
}

/// The `n`th alternative of `name`: `a.png` becomes `a_1.png`, `a_2.png`, ...
/// `n == 0` is the name itself.
pub fn numbered_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{name}_{n}"),
    }
}

// ============================================================================
// Log Table
// ============================================================================

/// The logical append-only table: one named blob inside one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTable {
    /// Blob name, unique within the container.
    pub name: String,
    /// Container (folder) the blob lives in.
    pub container_id: String,
    /// MIME type used when the blob is created.
    pub mime_type: String,
}

impl LogTable {
    /// Creates a table descriptor with the default CSV MIME type.
    pub fn new(name: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_id: container_id.into(),
            mime_type: TABLE_MIME_TYPE.to_string(),
        }
    }

    /// Creates a table with the default name in the given container.
    pub fn in_container(container_id: impl Into<String>) -> Self {
        Self::new(DEFAULT_TABLE_NAME, container_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_truncated_to_seconds() {
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap()
            .with_nanosecond(999_000_000)
            .unwrap();
        let entry = LogEntry::new(ts, "sato", "a.png", "cat");
        assert_eq!(entry.timestamp().nanosecond(), 0);
        assert_eq!(entry.timestamp_text(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_artifact_name() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            artifact_name(ts, "sato", ImageFormat::Png),
            "20240101_000000_sato.png"
        );
        assert_eq!(
            artifact_name(ts, "team/sato", ImageFormat::Jpeg),
            "20240101_000000_team_sato.jpg"
        );
    }

    #[test]
    fn test_for_artifact() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let entry = LogEntry::for_artifact(ts, "kim", ImageFormat::Png, "a dog");
        assert_eq!(entry.artifact_name(), "20240309_140507_kim.png");
        assert_eq!(entry.user(), "kim");
        assert_eq!(entry.prompt(), "a dog");
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("20240101_000000_sato.png", 0), "20240101_000000_sato.png");
        assert_eq!(numbered_name("20240101_000000_sato.png", 1), "20240101_000000_sato_1.png");
        assert_eq!(numbered_name("a.b.jpg", 12), "a.b_12.jpg");
        assert_eq!(numbered_name("noext", 2), "noext_2");
    }

    #[test]
    fn test_with_artifact_name_keeps_other_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let entry = LogEntry::for_artifact(ts, "kim", ImageFormat::Png, "a dog")
            .with_artifact_name("20240309_140507_kim_1.png");
        assert_eq!(entry.artifact_name(), "20240309_140507_kim_1.png");
        assert_eq!(entry.timestamp(), ts);
        assert_eq!(entry.prompt(), "a dog");
    }

    #[test]
    fn test_table_defaults() {
        let table = LogTable::in_container("folder-1");
        assert_eq!(table.name, "usage_log.csv");
        assert_eq!(table.container_id, "folder-1");
        assert_eq!(table.mime_type, "text/csv");
    }
}

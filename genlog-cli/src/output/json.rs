//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use genlog_core::{AspectRatio, LogEntry};
use genlog_store::{ArchiveStatus, GenerationOutcome, LogStatus};
use serde::{Serialize, Serializer};

use super::SaveResult;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one generation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    pub sent_prompt: String,
    pub aspect_ratio: AspectRatio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogOutput>,
}

/// The returned image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOutput {
    pub artifact_name: String,
    pub mime_type: String,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

/// The log step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOutput {
    pub appended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One usage-log row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRowOutput {
    #[serde(serialize_with = "serialize_datetime")]
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub image_file: String,
    pub prompt: String,
}

impl From<&LogEntry> for LogRowOutput {
    fn from(entry: &LogEntry) -> Self {
        Self {
            timestamp: entry.timestamp(),
            user: entry.user().to_string(),
            image_file: entry.artifact_name().to_string(),
            prompt: entry.prompt().to_string(),
        }
    }
}

impl GenerationOutput {
    /// Builds the output from a workflow outcome.
    pub fn from_outcome(outcome: &GenerationOutcome, saved: Option<&SaveResult>) -> Self {
        let image = outcome.image.as_ref().map(|image| ImageOutput {
            artifact_name: outcome
                .entry
                .as_ref()
                .map(|e| e.artifact_name().to_string())
                .unwrap_or_default(),
            mime_type: image.format.mime_type().to_string(),
            bytes: image.len(),
            saved_to: saved
                .and_then(|r| r.as_ref().ok())
                .map(|p| p.display().to_string()),
            save_error: saved.and_then(|r| r.as_ref().err()).cloned(),
        });

        let log = outcome.log.as_ref().map(|status| match status {
            LogStatus::Appended { attempts } => LogOutput {
                appended: true,
                attempts: Some(*attempts),
                error: None,
            },
            LogStatus::Failed(e) => LogOutput {
                appended: false,
                attempts: None,
                error: Some(e.to_string()),
            },
        });

        Self {
            sent_prompt: outcome.sent_prompt.clone(),
            aspect_ratio: outcome.params.aspect_ratio,
            image,
            archive: outcome.archive.clone(),
            log,
        }
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a generation outcome.
    pub fn format_generation(&self, outcome: &GenerationOutcome, saved: Option<&SaveResult>) -> Result<String> {
        self.format(&GenerationOutput::from_outcome(outcome, saved))
    }

    /// Formats log rows.
    pub fn format_rows(&self, rows: &[LogEntry]) -> Result<String> {
        let rows: Vec<LogRowOutput> = rows.iter().map(LogRowOutput::from).collect();
        self.format(&rows)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pretty() {
        let formatter = JsonFormatter::new(true);
        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let formatter = JsonFormatter::new(false);
        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(!output.contains('\n'));
    }
}

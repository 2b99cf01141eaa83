//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use genlog_core::{AspectRatio, BlobRef, GeneratedImage, GenerationParams, ImageFormat, LogEntry};
use genlog_store::{ArchiveStatus, CredentialStatus, GenerationOutcome, LogError, LogStatus, Settings};

use super::{CheckStep, JsonFormatter, SaveResult, TextFormatter};

fn saved(path: &str) -> SaveResult {
    Ok(PathBuf::from(path))
}

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

fn entry(prompt: &str) -> LogEntry {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    LogEntry::new(ts, "sato", "20240101_000000_sato.png", prompt)
}

fn outcome(log: LogStatus) -> GenerationOutcome {
    GenerationOutcome {
        sent_prompt: "a fox, bright, soft natural lighting, high-key exposure".to_string(),
        params: GenerationParams::default().with_aspect_ratio(AspectRatio::Landscape),
        image: Some(GeneratedImage::new(PNG.to_vec(), ImageFormat::Png)),
        entry: Some(entry("a fox")),
        archive: Some(ArchiveStatus::Stored {
            blob: BlobRef::new("file-1", "20240101_000000_sato.png"),
        }),
        log: Some(log),
    }
}

fn empty_outcome() -> GenerationOutcome {
    GenerationOutcome {
        sent_prompt: "a fox".to_string(),
        params: GenerationParams::default(),
        image: None,
        entry: None,
        archive: None,
        log: None,
    }
}

mod text_formatter_tests {
    use super::*;

    #[test]
    fn test_generation_success() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_generation(
            &outcome(LogStatus::Appended { attempts: 1 }),
            Some(&saved("/tmp/20240101_000000_sato.png")),
        );

        assert!(output.contains("Image ready: /tmp/20240101_000000_sato.png (10 B, png)"));
        assert!(output.contains("Aspect:   16:9"));
        assert!(output.contains("Archive:  stored (file-1)"));
        assert!(output.contains("Log:      appended"));
    }

    #[test]
    fn test_generation_logging_failed_keeps_image() {
        let formatter = TextFormatter::new(false);
        let failed = LogStatus::Failed(LogError::WriteFailed("403 Forbidden".into()));
        let output = formatter.format_generation(&outcome(failed), Some(&saved("/tmp/x.png")));

        assert!(output.starts_with("Image ready:"));
        assert!(output.contains("image ready, logging failed: Failed to write log table: 403 Forbidden"));
    }

    #[test]
    fn test_generation_save_failure_keeps_other_steps() {
        let formatter = TextFormatter::new(false);
        let failed_save: SaveResult = Err("permission denied".to_string());
        let failed_log = LogStatus::Failed(LogError::WriteFailed("403 Forbidden".into()));
        let output = formatter.format_generation(&outcome(failed_log), Some(&failed_save));

        assert!(output.starts_with("Image ready: 10 B"));
        assert!(output.contains("Saved:    failed: permission denied"));
        assert!(output.contains("Archive:  stored (file-1)"));
        assert!(output.contains("image ready, logging failed"));
    }

    #[test]
    fn test_generation_retried() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_generation(&outcome(LogStatus::Appended { attempts: 3 }), None);
        assert!(output.contains("appended after 3 attempts"));
    }

    #[test]
    fn test_generation_without_image() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_generation(&empty_outcome(), None);
        assert!(output.contains("No image returned"));
        assert!(!output.contains("Log:"));
        assert!(!output.contains("Archive:"));
    }

    #[test]
    fn test_rows_flatten_multiline_prompts() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_rows(&[entry("line one\nline two"), entry("short")]);

        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("line one line two"));
        assert!(output.contains("20240101_000000_sato.png"));
    }

    #[test]
    fn test_rows_empty() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_rows(&[]), "No log rows");
    }

    #[test]
    fn test_check_marks() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_check(&[
            CheckStep::pass("credentials", "key file"),
            CheckStep::fail("token", "invalid_grant"),
        ]);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with('✓'));
        assert!(lines[1].starts_with('✗'));
        assert!(lines[1].contains("invalid_grant"));
    }

    #[test]
    fn test_credentials_status() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_credentials(&CredentialStatus::default(), "system keychain");
        assert!(output.contains("none stored"));
        assert!(output.contains("not set"));
        assert!(output.contains("In use:           system keychain"));
    }

    #[test]
    fn test_settings_lists_every_key() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_settings(&Settings::default());

        for key in genlog_store::SETTING_KEYS {
            assert!(output.contains(key), "missing {key}");
        }
        assert!(output.contains("drive_folder_id        (unset)"));
        assert!(output.contains("allowed_users          (anyone)"));
        assert!(output.contains("archive_images         true"));
    }
}

mod json_formatter_tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_generation_json() {
        let formatter = JsonFormatter::new(false);
        let json = formatter
            .format_generation(
                &outcome(LogStatus::Appended { attempts: 2 }),
                Some(&saved("/tmp/a.png")),
            )
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["aspectRatio"], "16:9");
        assert_eq!(value["image"]["artifactName"], "20240101_000000_sato.png");
        assert_eq!(value["image"]["mimeType"], "image/png");
        assert_eq!(value["image"]["bytes"], 10);
        assert_eq!(value["image"]["savedTo"], "/tmp/a.png");
        assert_eq!(value["archive"]["status"], "stored");
        assert_eq!(value["log"]["appended"], true);
        assert_eq!(value["log"]["attempts"], 2);
    }

    #[test]
    fn test_generation_json_logging_failed() {
        let formatter = JsonFormatter::new(false);
        let failed = LogStatus::Failed(LogError::MultipleMatchesAmbiguous { count: 2 });
        let json = formatter.format_generation(&outcome(failed), None).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["log"]["appended"], false);
        assert!(value["log"]["error"].as_str().unwrap().contains("2 blobs match"));
        assert!(value["log"].get("attempts").is_none());
        assert!(value["image"].get("savedTo").is_none());
    }

    #[test]
    fn test_generation_json_save_failure() {
        let formatter = JsonFormatter::new(false);
        let failed_save: SaveResult = Err("disk full".to_string());
        let json = formatter
            .format_generation(&outcome(LogStatus::Appended { attempts: 1 }), Some(&failed_save))
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["image"]["saveError"], "disk full");
        assert!(value["image"].get("savedTo").is_none());
        assert_eq!(value["archive"]["status"], "stored");
        assert_eq!(value["log"]["appended"], true);
    }

    #[test]
    fn test_generation_json_without_image() {
        let formatter = JsonFormatter::new(false);
        let json = formatter.format_generation(&empty_outcome(), None).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert!(value.get("image").is_none());
        assert!(value.get("log").is_none());
        assert_eq!(value["sentPrompt"], "a fox");
    }

    #[test]
    fn test_rows_json() {
        let formatter = JsonFormatter::new(false);
        let json = formatter.format_rows(&[entry("cat, \"on the moon\"")]).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(value[0]["user"], "sato");
        assert_eq!(value[0]["imageFile"], "20240101_000000_sato.png");
        assert_eq!(value[0]["prompt"], "cat, \"on the moon\"");
    }

    #[test]
    fn test_check_json() {
        let formatter = JsonFormatter::new(false);
        let json = formatter.format(&[CheckStep::pass("settings", "ok")]).unwrap();
        assert_eq!(json, r#"[{"name":"settings","ok":true,"detail":"ok"}]"#);
    }
}

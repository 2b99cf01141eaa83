//! Text output formatting with colors.

use chrono::Local;
use genlog_core::LogEntry;
use genlog_store::{ArchiveStatus, CredentialStatus, GenerationOutcome, LogStatus, SETTING_KEYS, Settings};
use serde_json::Value;

use super::{CheckStep, SaveResult};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    prompt_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            prompt_width: 60,
        }
    }

    /// Sets how many prompt characters a log row shows.
    #[allow(dead_code)]
    pub fn with_prompt_width(mut self, width: usize) -> Self {
        self.prompt_width = width;
        self
    }

    /// Formats the result of a generation.
    pub fn format_generation(&self, outcome: &GenerationOutcome, saved: Option<&SaveResult>) -> String {
        let mut lines = Vec::new();

        match (&outcome.image, saved) {
            (Some(image), Some(Ok(path))) => lines.push(format!(
                "{} {} ({}, {})",
                self.green("Image ready:"),
                self.bold(&path.display().to_string()),
                format_bytes(image.len()),
                image.format.extension()
            )),
            (Some(image), other) => {
                lines.push(format!(
                    "{} {}",
                    self.green("Image ready:"),
                    format_bytes(image.len())
                ));
                if let Some(Err(e)) = other {
                    lines.push(format!("Saved:    {}", self.red(&format!("failed: {e}"))));
                }
            }
            (None, _) => lines.push(self.yellow("No image returned; nothing was archived or logged")),
        }

        lines.push(format!("Prompt:   {}", self.dim(&outcome.sent_prompt)));
        lines.push(format!("Aspect:   {}", outcome.params.aspect_ratio));

        if let Some(archive) = &outcome.archive {
            let text = match archive {
                ArchiveStatus::Stored { blob } => self.green(&format!("stored ({})", blob.id)),
                ArchiveStatus::Disabled => self.dim("disabled"),
                ArchiveStatus::Failed { error } => self.red(&format!("failed: {error}")),
            };
            lines.push(format!("Archive:  {text}"));
        }

        if let Some(log) = &outcome.log {
            let text = match log {
                LogStatus::Appended { attempts: 1 } => self.green("appended"),
                LogStatus::Appended { attempts } => {
                    self.green(&format!("appended after {attempts} attempts"))
                }
                LogStatus::Failed(e) => self.red(&format!("image ready, logging failed: {e}")),
            };
            lines.push(format!("Log:      {text}"));
        }

        lines.join("\n")
    }

    /// Formats usage-log rows, one per line.
    pub fn format_rows(&self, rows: &[LogEntry]) -> String {
        if rows.is_empty() {
            return self.dim("No log rows");
        }

        let user_width = rows.iter().map(|r| r.user().chars().count()).max().unwrap_or(0);
        rows.iter()
            .map(|row| {
                let when = row.timestamp().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
                format!(
                    "{}  {:<user_width$}  {}  {}",
                    self.dim(&when.to_string()),
                    row.user(),
                    self.cyan(row.artifact_name()),
                    self.one_line(row.prompt())
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Collapses line breaks and shortens long prompts.
    fn one_line(&self, prompt: &str) -> String {
        let flat: String = prompt
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        if flat.chars().count() <= self.prompt_width {
            return flat;
        }
        let cut: String = flat.chars().take(self.prompt_width.saturating_sub(1)).collect();
        format!("{cut}…")
    }

    /// Formats the check report.
    pub fn format_check(&self, steps: &[CheckStep]) -> String {
        steps
            .iter()
            .map(|step| {
                let mark = if step.ok { self.green("✓") } else { self.red("✗") };
                format!("{mark} {:<12} {}", step.name, step.detail)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats stored credential status.
    pub fn format_credentials(&self, status: &CredentialStatus, source: &str) -> String {
        let account = status
            .service_account
            .as_deref()
            .map_or_else(|| self.dim("none stored"), |a| self.cyan(a));
        let project = status.project_id.as_deref().unwrap_or("−");
        let passphrase = if status.passphrase_set {
            self.green("set")
        } else {
            self.dim("not set")
        };

        [
            format!("Keychain account: {account}"),
            format!("Project:          {project}"),
            format!("Passphrase:       {passphrase}"),
            format!("In use:           {source}"),
        ]
        .join("\n")
    }

    /// Formats settings as `key = value` lines.
    pub fn format_settings(&self, settings: &Settings) -> String {
        let values = serde_json::to_value(settings).unwrap_or(Value::Null);
        let mut lines = vec![self.bold("genlog Configuration"), "─".repeat(40)];
        for key in SETTING_KEYS {
            let value = match values.get(*key) {
                None | Some(Value::Null) => self.dim("(unset)"),
                Some(Value::String(s)) => s.clone(),
                Some(Value::Array(items)) if items.is_empty() => self.dim("(anyone)"),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(other) => other.to_string(),
            };
            lines.push(format!("{key:<22} {value}"));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.1} MB", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1} KB", n as f64 / 1_000.0)
    } else {
        format!("{n} B")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1_500), "1.5 KB");
        assert_eq!(format_bytes(2_500_000), "2.5 MB");
    }

    #[test]
    fn test_one_line_flattens_and_truncates() {
        let formatter = TextFormatter::new(false).with_prompt_width(10);
        assert_eq!(formatter.one_line("a\r\nb"), "a  b");
        assert_eq!(formatter.one_line("abcdefghijkl"), "abcdefghi…");
    }

    #[test]
    fn test_colors_only_when_enabled() {
        assert!(TextFormatter::new(true).red("x").contains(RED));
        assert_eq!(TextFormatter::new(false).red("x"), "x");
    }
}

//! Output formatting for CLI.

mod json;
mod text;

use std::path::PathBuf;

use serde::Serialize;

pub use json::JsonFormatter;
pub use text::TextFormatter;
#[cfg(test)]
mod tests;

/// Where the image was saved locally, or why saving failed.
pub type SaveResult = Result<PathBuf, String>;

/// One line of the `check` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckStep {
    /// What was checked.
    pub name: &'static str,
    /// Whether it passed.
    pub ok: bool,
    /// What was found.
    pub detail: String,
}

impl CheckStep {
    /// A passing step.
    pub fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    /// A failing step.
    pub fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

//! Blob references and contents returned by remote stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version token of a blob.
///
/// Stores hand one out on every read and write; passing it back to
/// `update_content` makes the update conditional on the blob not having
/// changed in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Wraps a backend version string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a blob in a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    /// Backend identifier.
    pub id: String,
    /// Blob name within its container.
    pub name: String,
    /// Revision at the time this reference was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
}

impl BlobRef {
    /// Creates a reference without revision information.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            revision: None,
        }
    }

    /// Attaches a revision.
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }
}

/// Full content of a blob plus the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContent {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// Revision the bytes belong to, if the store tracks one.
    pub revision: Option<Revision>,
}

impl BlobContent {
    /// Creates blob content.
    pub fn new(bytes: Vec<u8>, revision: Option<Revision>) -> Self {
        Self { bytes, revision }
    }
}

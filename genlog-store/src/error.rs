//! Store error types.

use genlog_core::BlobStoreError;
use thiserror::Error;

/// Failures of a usage-log append.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The table lookup failed; nothing was written.
    #[error("Log store unavailable: {0}")]
    StoreUnavailable(String),

    /// The existing table could not be read; nothing was written.
    #[error("Failed to read log table: {0}")]
    ReadFailed(String),

    /// The table content is not valid UTF-8; nothing was written.
    #[error("Log table is not valid UTF-8: {0}")]
    Undecodable(String),

    /// Creating or updating the table failed.
    #[error("Failed to write log table: {0}")]
    WriteFailed(String),

    /// A concurrent writer created a second table. The entry was stored in
    /// the table created by this call.
    #[error("Duplicate log tables named {name}: {count} found after create")]
    DuplicateTable {
        /// Table name.
        name: String,
        /// Tables now carrying the name.
        count: usize,
    },

    /// More than one table with the name already existed; nothing was written.
    #[error("Ambiguous log table: {count} blobs match")]
    MultipleMatchesAmbiguous {
        /// Number of matching blobs.
        count: usize,
    },

    /// The table changed between read and write; nothing was written.
    #[error("Log table changed concurrently (expected revision {expected}, found {actual})")]
    Conflict {
        /// Revision observed at read time.
        expected: String,
        /// Revision found at write time.
        actual: String,
    },

    /// A row could not be encoded.
    #[error("Failed to encode log row: {0}")]
    Encoding(String),
}

impl LogError {
    /// Returns true if re-running the whole append is safe and may succeed.
    ///
    /// Only failures that guarantee nothing was written qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LogError::Conflict { .. } | LogError::StoreUnavailable(_) | LogError::ReadFailed(_)
        )
    }

    /// Wraps a store failure during a write.
    pub(crate) fn write(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::Conflict { expected, actual } => LogError::Conflict { expected, actual },
            other => LogError::WriteFailed(other.to_string()),
        }
    }
}

/// Errors from settings and credential persistence.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown key or unparseable value.
    #[error("Invalid setting: {0}")]
    Invalid(String),

    /// Keychain failure.
    #[error("Keychain error: {0}")]
    Keychain(#[from] genlog_fetch::KeychainError),

    /// Credential validation failure.
    #[error(transparent)]
    Core(#[from] genlog_core::CoreError),
}

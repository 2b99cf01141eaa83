//! Core error types for `genlog`.

use thiserror::Error;

/// Core error type for `genlog` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data (malformed row, bad timestamp, unexpected response).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Session could not be established for this user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Service credentials missing or unusable.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Image generation request failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delimited-text encoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// Errors reported by a [`RemoteLogStore`](crate::RemoteLogStore) implementation.
///
/// These describe what the store saw. The synchronizer maps them onto its own
/// error taxonomy depending on which step of the append failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobStoreError {
    /// Network failure, timeout, or 5xx from the backend.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Credentials rejected by the backend.
    #[error("Store authentication failed: {0}")]
    Auth(String),

    /// Blob or container does not exist.
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// The blob changed since the expected revision was observed.
    #[error("Revision conflict: expected {expected}, found {actual}")]
    Conflict {
        /// Revision the caller read.
        expected: String,
        /// Revision currently stored.
        actual: String,
    },

    /// The backend refused the request (permissions, quota, bad input).
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl BlobStoreError {
    /// Returns true if this error is likely transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display() {
        let err = BlobStoreError::Conflict {
            expected: "3".into(),
            actual: "4".into(),
        };
        assert_eq!(err.to_string(), "Revision conflict: expected 3, found 4");
    }

    #[test]
    fn test_is_transient() {
        assert!(BlobStoreError::Unavailable("reset".into()).is_transient());
        assert!(!BlobStoreError::Auth("expired".into()).is_transient());
        assert!(!BlobStoreError::NotFound("abc".into()).is_transient());
    }
}

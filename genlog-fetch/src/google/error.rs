//! Google API errors.

use genlog_core::{BlobStoreError, CoreError};
use reqwest::StatusCode;
use thiserror::Error;

use crate::error::HttpError;

/// Errors from the Google clients.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Service-account key missing or unusable.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Token exchange failed.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The API rejected our credentials (401/403).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited (429).
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
    },

    /// Server-side failure (5xx).
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// Any other unsuccessful response.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// Revision changed underneath us.
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        /// Version we read.
        expected: String,
        /// Version now stored.
        actual: String,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Unparseable response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Longest response body excerpt kept in an error.
const MAX_MESSAGE_LEN: usize = 300;

impl GoogleError {
    /// Classifies an unsuccessful HTTP response.
    pub fn from_status(status: StatusCode, body: &str, retry_after: Option<u64>) -> Self {
        let message = excerpt(body);
        match status.as_u16() {
            401 | 403 => Self::AuthenticationFailed(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimited { retry_after },
            code @ 500..=599 => Self::Server { status: code, message },
            code => Self::Api { status: code, message },
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

impl From<GoogleError> for BlobStoreError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Credentials(m)
            | GoogleError::TokenExchange(m)
            | GoogleError::AuthenticationFailed(m) => BlobStoreError::Auth(m),
            GoogleError::NotFound(m) => BlobStoreError::NotFound(m),
            GoogleError::VersionConflict { expected, actual } => {
                BlobStoreError::Conflict { expected, actual }
            }
            GoogleError::RateLimited { .. } | GoogleError::Server { .. } | GoogleError::Http(_) => {
                BlobStoreError::Unavailable(err.to_string())
            }
            GoogleError::Api { .. } | GoogleError::Parse(_) => {
                BlobStoreError::Rejected(err.to_string())
            }
        }
    }
}

impl From<GoogleError> for CoreError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Credentials(m) => CoreError::Credentials(m),
            other => CoreError::Generation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert!(matches!(
            GoogleError::from_status(StatusCode::FORBIDDEN, "no", None),
            GoogleError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GoogleError::from_status(StatusCode::TOO_MANY_REQUESTS, "", Some(7)),
            GoogleError::RateLimited { retry_after: Some(7) }
        ));
        assert!(matches!(
            GoogleError::from_status(StatusCode::BAD_GATEWAY, "", None),
            GoogleError::Server { status: 502, .. }
        ));
        assert!(matches!(
            GoogleError::from_status(StatusCode::BAD_REQUEST, "bad", None),
            GoogleError::Api { status: 400, .. }
        ));
    }

    #[test]
    fn test_blob_store_mapping() {
        let unavailable: BlobStoreError = GoogleError::Server {
            status: 503,
            message: String::new(),
        }
        .into();
        assert!(unavailable.is_transient());

        let auth: BlobStoreError = GoogleError::AuthenticationFailed("expired".into()).into();
        assert_eq!(auth, BlobStoreError::Auth("expired".into()));

        let conflict: BlobStoreError = GoogleError::VersionConflict {
            expected: "1".into(),
            actual: "2".into(),
        }
        .into();
        assert!(matches!(conflict, BlobStoreError::Conflict { .. }));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(1000);
        let err = GoogleError::from_status(StatusCode::BAD_REQUEST, &long, None);
        assert!(err.to_string().len() < 400);
    }
}

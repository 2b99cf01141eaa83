//! Per-user session state.
//!
//! A [`Session`] is created once a user has been admitted by an
//! [`AccessPolicy`] and is passed explicitly to every handler that needs to
//! know who is acting. Nothing about the current user lives in process-wide
//! state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Who may start a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    /// Users allowed in. Empty means any non-empty user id.
    pub allowed_users: Vec<String>,
    /// Shared passphrase, if one is required.
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,
}

impl AccessPolicy {
    /// A policy admitting any user without a passphrase.
    pub fn open() -> Self {
        Self::default()
    }

    /// Requires a shared passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Restricts the set of users.
    pub fn with_allowed_users(mut self, users: Vec<String>) -> Self {
        self.allowed_users = users;
        self
    }
}

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user: String,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Admits `user` under `policy`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Unauthorized` if the user id is blank, the user is
    /// not on the allow list, or the passphrase does not match.
    pub fn authenticate(
        user: &str,
        passphrase: Option<&str>,
        policy: &AccessPolicy,
    ) -> Result<Self, CoreError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(CoreError::Unauthorized("user id is empty".to_string()));
        }

        if !policy.allowed_users.is_empty() && !policy.allowed_users.iter().any(|u| u == user) {
            return Err(CoreError::Unauthorized(format!("user {user} is not allowed")));
        }

        if let Some(expected) = &policy.passphrase {
            if passphrase != Some(expected.as_str()) {
                return Err(CoreError::Unauthorized("passphrase mismatch".to_string()));
            }
        }

        Ok(Self {
            user: user.to_string(),
            started_at: Utc::now(),
        })
    }

    /// The session's user id.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// When the session started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

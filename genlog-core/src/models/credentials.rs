//! Google service-account credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Default OAuth2 token endpoint when the key file omits `token_uri`.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A service-account key as issued by Google Cloud.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCredentials {
    /// Credential type (expected: `service_account`).
    #[serde(rename = "type", default)]
    pub credential_type: Option<String>,

    /// Project the account belongs to.
    pub project_id: String,

    /// Key identifier, sent as the JWT `kid`.
    #[serde(default)]
    pub private_key_id: Option<String>,

    /// PEM-encoded RSA private key.
    pub private_key: String,

    /// Service account e-mail, the JWT issuer.
    pub client_email: String,

    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceCredentials {
    /// Parses a service-account key from JSON.
    ///
    /// Secret stores frequently keep the key on one line with literal `\n`
    /// sequences; those are turned back into newlines so the PEM parses.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Credentials` if the JSON is malformed or a required
    /// field is empty.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut creds: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Credentials(format!("malformed key: {e}")))?;
        creds.private_key = creds.private_key.replace("\\n", "\n");
        creds.validate()?;
        Ok(creds)
    }

    /// Checks required fields.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Credentials` naming the first unusable field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(kind) = &self.credential_type {
            if kind != "service_account" {
                return Err(CoreError::Credentials(format!(
                    "expected a service_account key, got {kind}"
                )));
            }
        }
        if self.project_id.trim().is_empty() {
            return Err(CoreError::Credentials("project_id is empty".to_string()));
        }
        if self.client_email.trim().is_empty() {
            return Err(CoreError::Credentials("client_email is empty".to_string()));
        }
        if !self.private_key.contains("PRIVATE KEY") {
            return Err(CoreError::Credentials(
                "private_key is not a PEM key".to_string(),
            ));
        }
        Ok(())
    }

    /// Serializes back to JSON (for storing in a secret store).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

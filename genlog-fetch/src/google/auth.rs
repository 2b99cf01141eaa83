//! Service-account OAuth tokens.
//!
//! Exchanges a signed JWT assertion for an access token using the
//! `urn:ietf:params:oauth:grant-type:jwt-bearer` grant, and caches the token
//! until shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use genlog_core::ServiceCredentials;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::error::GoogleError;
use crate::host::http::{HttpClient, ResponseExt};

// ============================================================================
// Constants
// ============================================================================

/// Scope for Vertex AI.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Scope for Drive file access.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

// ============================================================================
// Token Source
// ============================================================================

/// Produces access tokens for a service account.
pub struct TokenSource {
    http: HttpClient,
    credentials: ServiceCredentials,
    scopes: Vec<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_email", &self.credentials.client_email)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Creates a token source for the given scopes.
    pub fn new(http: HttpClient, credentials: ServiceCredentials, scopes: &[&str]) -> Self {
        Self {
            http,
            credentials,
            scopes: scopes.iter().map(ToString::to_string).collect(),
            cached: Mutex::new(None),
        }
    }

    /// Creates a token source with the Vertex AI and Drive scopes.
    pub fn with_default_scopes(http: HttpClient, credentials: ServiceCredentials) -> Self {
        Self::new(http, credentials, &[CLOUD_PLATFORM_SCOPE, DRIVE_SCOPE])
    }

    /// Project the credentials belong to.
    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    /// Service account e-mail.
    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// Signs the JWT assertion sent to the token endpoint.
    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, GoogleError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.credentials.client_email,
            scope: self.scopes.join(" "),
            aud: &self.credentials.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.credentials.private_key_id);

        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| GoogleError::Credentials(format!("invalid private key: {e}")))?;

        encode(&header, &claims, &key)
            .map_err(|e| GoogleError::Credentials(format!("JWT signing failed: {e}")))
    }

    /// Returns a valid access token, exchanging a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the token exchange fails.
    #[instrument(skip(self), fields(account = %self.credentials.client_email))]
    pub async fn access_token(&self) -> Result<String, GoogleError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            debug!("Using cached access token");
            return Ok(token.token.clone());
        }

        info!("Exchanging service-account assertion for access token");
        let assertion = self.sign_assertion(now)?;
        let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self.http.post_form(&self.credentials.token_uri, &form).await?;
        if !response.status().is_success() {
            let status = response.status();
            let retry_after = response.retry_after_secs();
            let body = response.text().await.unwrap_or_default();
            return Err(match GoogleError::from_status(status, &body, retry_after) {
                GoogleError::Api { status, message } => {
                    GoogleError::TokenExchange(format!("{status}: {message}"))
                }
                other => other,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::Parse(e.to_string()))?;

        let expires_at = now + Duration::seconds(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        debug!(%expires_at, "Access token obtained");

        let access = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at,
        });
        Ok(access)
    }

    /// Drops the cached token (after the API rejected it).
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

//! HTTP client with tracing, retries, and domain allowlist.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Domain allowlist (Google API hosts by default)
//! - Retries of idempotent GETs on connection errors and timeouts
//! - Bearer-token convenience methods

use reqwest::{Client, Method, Response, header};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::HttpError;
use crate::retry::RetryStrategy;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for genlog.
const USER_AGENT: &str = concat!("genlog/", env!("CARGO_PKG_VERSION"));

/// Hosts the Google clients talk to.
pub const GOOGLE_API_DOMAINS: &[&str] = &["googleapis.com"];

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing, retries, and domain allowlist.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    allowed_domains: Option<Vec<String>>,
    retry_strategy: RetryStrategy,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: client,
            allowed_domains: None,
            retry_strategy: RetryStrategy::default(),
        })
    }

    /// Creates a client restricted to the Google API hosts.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn for_google(timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self::with_timeout(timeout)?
            .with_allowed_domains(GOOGLE_API_DOMAINS.iter().map(ToString::to_string).collect()))
    }

    /// Restricts requests to the given domains (and their subdomains).
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Sets the retry strategy for idempotent requests.
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let Some(ref allowed) = self.allowed_domains else {
            return Ok(()); // No restrictions
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Performs a GET request with a bearer token, retrying transport failures.
    #[instrument(skip(self, token, query), fields(url = %url))]
    pub async fn get_with_bearer(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(attempt, "GET request");

            let result = self
                .inner
                .get(url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await;

            match result {
                Ok(response) => {
                    debug!(status = %response.status(), "Response received");
                    return Ok(response);
                }
                Err(e)
                    if self.retry_strategy.should_retry(&e)
                        && self.retry_strategy.allows_another(attempt) =>
                {
                    let delay = self.retry_strategy.delay_for_attempt(attempt);
                    warn!(
                        error = %e,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_timeout() => return Err(HttpError::Timeout),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Performs a POST request with a JSON body and a bearer token.
    #[instrument(skip(self, token, body), fields(url = %url))]
    pub async fn post_json_with_bearer<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &T,
    ) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;
        debug!("POST request with JSON");

        let response = self
            .inner
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Sends a raw body with a bearer token (uploads).
    #[instrument(skip(self, token, query, body), fields(url = %url, bytes = body.len()))]
    pub async fn send_bytes_with_bearer(
        &self,
        method: Method,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;
        debug!(%method, "Upload request");

        let response = self
            .inner
            .request(method, url)
            .bearer_auth(token)
            .query(query)
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(map_send_error)?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with form data.
    #[instrument(skip(self, form), fields(url = %url))]
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;
        debug!("POST request with form data");

        let response = self
            .inner
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(map_send_error)?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

fn map_send_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout
    } else {
        HttpError::Request(err)
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Check if the response indicates rate limiting.
    fn is_rate_limited(&self) -> bool;

    /// Get the Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;
}

impl ResponseExt for Response {
    fn is_rate_limited(&self) -> bool {
        self.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
    }

    fn retry_after_secs(&self) -> Option<u64> {
        self.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_allowlist() {
        let client = HttpClient::for_google(Duration::from_secs(5)).unwrap();

        assert!(client.is_domain_allowed("https://www.googleapis.com/drive/v3/files").is_ok());
        assert!(client
            .is_domain_allowed("https://us-central1-aiplatform.googleapis.com/v1/projects")
            .is_ok());
        assert!(client.is_domain_allowed("https://oauth2.googleapis.com/token").is_ok());

        assert!(client.is_domain_allowed("https://evil.com/steal").is_err());
        assert!(client.is_domain_allowed("https://googleapis.com.evil.com").is_err());
    }

    #[test]
    fn test_no_domain_restrictions() {
        let client = HttpClient::new().unwrap();
        assert!(client.is_domain_allowed("https://any.domain.com").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new()
            .unwrap()
            .with_allowed_domains(vec!["example.com".to_string()]);

        assert!(matches!(
            client.is_domain_allowed("not-a-valid-url"),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(matches!(
            client.is_domain_allowed("https://evil.com/path"),
            Err(HttpError::DomainNotAllowed(_))
        ));
    }
}

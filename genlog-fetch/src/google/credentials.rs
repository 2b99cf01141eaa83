//! Service-account credential providers.
//!
//! Credentials are loaded from (in order of preference):
//! 1. An explicit key file path
//! 2. The `GOOGLE_APPLICATION_CREDENTIALS` environment variable
//! 3. The system keychain (`genlog:google` / `service_account`)

use std::path::{Path, PathBuf};

use genlog_core::{CoreError, CredentialProvider, ServiceCredentials};
use tracing::{debug, instrument};

use crate::host::keychain::{accounts, get_password_cached, services};

/// Environment variable naming a service-account key file.
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

// ============================================================================
// File Provider
// ============================================================================

/// Reads a service-account key JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialProvider {
    path: PathBuf,
}

impl FileCredentialProvider {
    /// Creates a provider for the given key file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a provider from `GOOGLE_APPLICATION_CREDENTIALS`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(CREDENTIALS_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    /// Key file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialProvider for FileCredentialProvider {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn credentials(&self) -> Result<ServiceCredentials, CoreError> {
        debug!("Reading service-account key file");
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            CoreError::Credentials(format!("cannot read {}: {e}", self.path.display()))
        })?;
        ServiceCredentials::from_json(&content)
    }

    fn source(&self) -> String {
        format!("file {}", self.path.display())
    }
}

// ============================================================================
// Keychain Provider
// ============================================================================

/// Reads the service-account key stored in the system keychain.
#[derive(Debug, Clone, Default)]
pub struct KeychainCredentialProvider;

impl KeychainCredentialProvider {
    /// Creates a new keychain provider.
    pub fn new() -> Self {
        Self
    }

    /// Whether a key is stored.
    pub fn is_available() -> bool {
        get_password_cached(services::GOOGLE, accounts::SERVICE_ACCOUNT).is_some()
    }
}

impl CredentialProvider for KeychainCredentialProvider {
    fn credentials(&self) -> Result<ServiceCredentials, CoreError> {
        let json = get_password_cached(services::GOOGLE, accounts::SERVICE_ACCOUNT)
            .ok_or_else(|| {
                CoreError::Credentials(
                    "no service-account key in keychain; run `genlog credentials import <file>`"
                        .to_string(),
                )
            })?;
        ServiceCredentials::from_json(&json)
    }

    fn source(&self) -> String {
        "system keychain".to_string()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Whichever provider applies.
#[derive(Debug, Clone)]
pub enum AnyCredentialProvider {
    /// Key file.
    File(FileCredentialProvider),
    /// System keychain.
    Keychain(KeychainCredentialProvider),
}

impl AnyCredentialProvider {
    /// Picks a provider: explicit path, then the environment, then the keychain.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::File(FileCredentialProvider::new(path));
        }
        if let Some(provider) = FileCredentialProvider::from_env() {
            return Self::File(provider);
        }
        Self::Keychain(KeychainCredentialProvider::new())
    }
}

impl CredentialProvider for AnyCredentialProvider {
    fn credentials(&self) -> Result<ServiceCredentials, CoreError> {
        match self {
            Self::File(p) => p.credentials(),
            Self::Keychain(p) => p.credentials(),
        }
    }

    fn source(&self) -> String {
        match self {
            Self::File(p) => p.source(),
            Self::Keychain(p) => p.source(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Secure credential storage using the system keychain.
//!
//! This module provides access to the system's secure credential storage:
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)
//!
//! ## Caching
//!
//! Reading the keychain may prompt the user. `get_password_cached()` caches
//! each lookup (including misses) for the lifetime of the process; writers
//! call `invalidate_cache_entry()` after changing a value.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, trace, warn};

use crate::error::KeychainError;

/// Service name prefix for genlog credentials.
const SERVICE_PREFIX: &str = "genlog";

// ============================================================================
// Keychain Cache (Global)
// ============================================================================

/// Key: "service:account", Value: `None` means "no entry found".
static KEYCHAIN_CACHE: OnceLock<Mutex<HashMap<String, Option<String>>>> = OnceLock::new();

fn get_cache() -> &'static Mutex<HashMap<String, Option<String>>> {
    KEYCHAIN_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Builds the full service name with prefix.
pub fn full_service(service: &str) -> String {
    format!("{SERVICE_PREFIX}:{service}")
}

/// Get a password from the keychain with caching (sync).
///
/// `service` is the unprefixed service name (see [`services`]).
pub fn get_password_cached(service: &str, account: &str) -> Option<String> {
    let service = full_service(service);
    let cache_key = format!("{service}:{account}");

    if let Ok(cache) = get_cache().lock() {
        if let Some(cached) = cache.get(&cache_key) {
            trace!(service = %service, account = %account, hit = true, "Keychain cache lookup");
            return cached.clone();
        }
    }

    trace!(service = %service, account = %account, hit = false, "Keychain cache miss, reading from keychain");

    let result = match Entry::new(&service, account) {
        Ok(entry) => match entry.get_password() {
            Ok(password) if !password.is_empty() => Some(password),
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to get password from keychain");
                None
            }
        },
        Err(e) => {
            warn!(service = %service, account = %account, error = %e, "Failed to create keychain entry");
            None
        }
    };

    if let Ok(mut cache) = get_cache().lock() {
        cache.insert(cache_key, result.clone());
    }

    result
}

/// Invalidate a specific cache entry.
pub fn invalidate_cache_entry(service: &str, account: &str) {
    let cache_key = format!("{}:{account}", full_service(service));
    if let Ok(mut cache) = get_cache().lock() {
        cache.remove(&cache_key);
        debug!(service = %service, account = %account, "Invalidated keychain cache entry");
    }
}

// ============================================================================
// Keychain API Trait
// ============================================================================

/// API for secure credential storage.
#[async_trait]
pub trait KeychainApi: Send + Sync {
    /// Get a credential. `Ok(None)` if it does not exist.
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError>;

    /// Set a credential.
    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), KeychainError>;

    /// Delete a credential. Deleting a missing credential succeeds.
    async fn delete(&self, service: &str, account: &str) -> Result<(), KeychainError>;

    /// Check if a credential exists.
    async fn exists(&self, service: &str, account: &str) -> bool {
        matches!(self.get(service, account).await, Ok(Some(_)))
    }
}

// ============================================================================
// System Keychain Implementation
// ============================================================================

/// Default implementation using the system keychain.
#[derive(Debug, Clone, Default)]
pub struct SystemKeychain;

impl SystemKeychain {
    /// Creates a new system keychain instance.
    pub fn new() -> Self {
        Self
    }

    fn entry(service: &str, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&full_service(service), account)
            .map_err(|e| KeychainError::Platform(e.to_string()))
    }
}

#[async_trait]
impl KeychainApi for SystemKeychain {
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError> {
        debug!(service = %service, account = %account, "Getting credential from keychain");

        match Self::entry(service, account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!(service = %service, account = %account, "Credential not found");
                Ok(None)
            }
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to get credential");
                Err(e.into())
            }
        }
    }

    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), KeychainError> {
        debug!(service = %service, account = %account, "Setting credential in keychain");

        Self::entry(service, account)?
            .set_password(secret)
            .map_err(|e| {
                warn!(service = %service, account = %account, error = %e, "Failed to set credential");
                KeychainError::from(e)
            })?;

        invalidate_cache_entry(service, account);
        Ok(())
    }

    async fn delete(&self, service: &str, account: &str) -> Result<(), KeychainError> {
        debug!(service = %service, account = %account, "Deleting credential from keychain");

        let result = match Self::entry(service, account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to delete credential");
                Err(e.into())
            }
        };

        invalidate_cache_entry(service, account);
        result
    }
}

// ============================================================================
// Common Credential Keys
// ============================================================================

/// Service names.
pub mod services {
    /// Google service account used for Vertex AI and Drive.
    pub const GOOGLE: &str = "google";
    /// Shared access passphrase for starting sessions.
    pub const ACCESS: &str = "access";
}

/// Account names.
pub mod accounts {
    /// Service-account key JSON.
    pub const SERVICE_ACCOUNT: &str = "service_account";
    /// Shared passphrase.
    pub const PASSPHRASE: &str = "passphrase";
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_service_name() {
        assert_eq!(full_service("google"), "genlog:google");
        assert_eq!(full_service(services::ACCESS), "genlog:access");
    }

    // Real keychain access needs a desktop session; the trait is exercised
    // through an in-memory implementation in genlog-store.
}

//! Credential vault on top of the system keychain.
//!
//! Stores the service-account key and the optional shared access passphrase.
//! Keys are validated and normalized before they are stored, so what the
//! keychain holds always parses.

use genlog_core::ServiceCredentials;
use genlog_fetch::host::keychain::{accounts, services};
use genlog_fetch::KeychainApi;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::SettingsError;

/// What is currently stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    /// Service account e-mail, if a key is stored.
    pub service_account: Option<String>,
    /// Project of the stored key.
    pub project_id: Option<String>,
    /// Whether a shared passphrase is stored.
    pub passphrase_set: bool,
}

/// Reads and writes genlog secrets through a [`KeychainApi`].
#[derive(Debug, Clone)]
pub struct CredentialVault<K> {
    keychain: K,
}

impl<K: KeychainApi> CredentialVault<K> {
    /// Creates a vault.
    pub fn new(keychain: K) -> Self {
        Self { keychain }
    }

    /// Validates a service-account key and stores it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not parse or the keychain write fails.
    #[instrument(skip_all)]
    pub async fn import_service_account(&self, json: &str) -> Result<ServiceCredentials, SettingsError> {
        let creds = ServiceCredentials::from_json(json)?;
        self.keychain
            .set(services::GOOGLE, accounts::SERVICE_ACCOUNT, &creds.to_json()?)
            .await?;
        info!(client_email = %creds.client_email, "Service account stored");
        Ok(creds)
    }

    /// The stored service-account key.
    ///
    /// # Errors
    ///
    /// Returns an error if the keychain read fails or the stored key is
    /// unusable.
    pub async fn service_account(&self) -> Result<Option<ServiceCredentials>, SettingsError> {
        match self
            .keychain
            .get(services::GOOGLE, accounts::SERVICE_ACCOUNT)
            .await?
        {
            Some(json) => Ok(Some(ServiceCredentials::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Removes the stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the keychain delete fails.
    pub async fn forget_service_account(&self) -> Result<(), SettingsError> {
        self.keychain
            .delete(services::GOOGLE, accounts::SERVICE_ACCOUNT)
            .await?;
        debug!("Service account removed");
        Ok(())
    }

    /// The shared access passphrase.
    ///
    /// # Errors
    ///
    /// Returns an error if the keychain read fails.
    pub async fn passphrase(&self) -> Result<Option<String>, SettingsError> {
        Ok(self
            .keychain
            .get(services::ACCESS, accounts::PASSPHRASE)
            .await?
            .filter(|p| !p.is_empty()))
    }

    /// Stores the shared passphrase. An empty value removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the keychain write fails.
    pub async fn set_passphrase(&self, passphrase: &str) -> Result<(), SettingsError> {
        if passphrase.is_empty() {
            self.keychain.delete(services::ACCESS, accounts::PASSPHRASE).await?;
        } else {
            self.keychain
                .set(services::ACCESS, accounts::PASSPHRASE, passphrase)
                .await?;
        }
        Ok(())
    }

    /// Summarizes what is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if a keychain read fails.
    pub async fn status(&self) -> Result<CredentialStatus, SettingsError> {
        let creds = self.service_account().await?;
        Ok(CredentialStatus {
            service_account: creds.as_ref().map(|c| c.client_email.clone()),
            project_id: creds.map(|c| c.project_id),
            passphrase_set: self.passphrase().await?.is_some(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

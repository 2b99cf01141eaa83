//! CLI command implementations.

pub mod check;
pub mod config;
pub mod credentials;
pub mod decorate;
pub mod generate;
pub mod log;

use std::sync::Arc;

use anyhow::{Context, Result};
use genlog_core::{CredentialProvider, LogTable, Session};
use genlog_fetch::SystemKeychain;
use genlog_fetch::google::{AnyCredentialProvider, DriveLogStore, ImagenClient, TokenSource};
use genlog_fetch::HttpClient;
use genlog_store::{CredentialVault, Settings, SettingsStore};
use tracing::{debug, warn};

use crate::Cli;

/// Loads the persisted settings, falling back to defaults.
pub async fn load_settings() -> Settings {
    SettingsStore::load_default().await.get().await
}

/// The configured log table.
pub fn require_table(settings: &Settings) -> Result<LogTable> {
    settings
        .log_table()
        .context("no Drive folder configured (run `genlog config set drive_folder_id <id>`)")
}

/// Admits the `--user` under the configured access policy.
pub async fn open_session(cli: &Cli, settings: &Settings) -> Result<Session> {
    let user = cli
        .user
        .as_deref()
        .context("--user is required for this command")?;
    // No keychain backend means no passphrase can have been stored either.
    let passphrase = match CredentialVault::new(SystemKeychain::new()).passphrase().await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Keychain unavailable, no passphrase required");
            None
        }
    };
    let session = Session::authenticate(user, cli.passphrase.as_deref(), &settings.access_policy(passphrase))?;
    debug!(user = %session.user(), "Session started");
    Ok(session)
}

/// Authenticated Google clients sharing one token cache.
pub struct GoogleStack {
    http: HttpClient,
    tokens: Arc<TokenSource>,
}

impl GoogleStack {
    /// Resolves credentials and prepares the HTTP client.
    pub fn connect(settings: &Settings) -> Result<Self> {
        let provider = AnyCredentialProvider::resolve(settings.credentials_path.as_deref());
        let source = provider.source();
        let credentials = provider
            .credentials()
            .with_context(|| format!("loading credentials from {source}"))?;
        let http = HttpClient::for_google(settings.http_timeout())?;
        let tokens = Arc::new(TokenSource::with_default_scopes(http.clone(), credentials));
        debug!(source = %source, client_email = %tokens.client_email(), "Credentials loaded");
        Ok(Self { http, tokens })
    }

    /// Drive-backed log store.
    pub fn drive(&self) -> DriveLogStore {
        DriveLogStore::new(self.http.clone(), Arc::clone(&self.tokens))
    }

    /// Imagen client for the configured region and model.
    pub fn imagen(&self, settings: &Settings) -> ImagenClient {
        ImagenClient::builder()
            .location(&settings.vertex_location)
            .model(&settings.imagen_model)
            .build(self.http.clone(), Arc::clone(&self.tokens))
    }
}

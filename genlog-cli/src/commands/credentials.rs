//! Credentials command - keychain-held service-account key and passphrase.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use genlog_core::CredentialProvider;
use genlog_fetch::SystemKeychain;
use genlog_fetch::google::AnyCredentialProvider;
use genlog_store::CredentialVault;
use serde::Serialize;

use super::load_settings;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the credentials command.
#[derive(Args)]
pub struct CredentialsArgs {
    #[command(subcommand)]
    pub action: CredentialsAction,
}

/// Credentials subcommands.
#[derive(Subcommand)]
pub enum CredentialsAction {
    /// Store a service-account key file in the keychain.
    Import {
        /// Path to the JSON key.
        file: PathBuf,
    },

    /// Show what is stored and which source is used.
    Status,

    /// Remove the stored service-account key.
    Forget,

    /// Set the shared access passphrase. An empty value removes it.
    Passphrase {
        /// New passphrase.
        value: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput {
    #[serde(flatten)]
    stored: genlog_store::CredentialStatus,
    in_use: String,
}

/// Runs the credentials command.
pub async fn run(args: &CredentialsArgs, cli: &Cli) -> Result<()> {
    let vault = CredentialVault::new(SystemKeychain::new());

    match &args.action {
        CredentialsAction::Import { file } => {
            let json = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let creds = vault.import_service_account(&json).await?;
            if !cli.quiet {
                println!("Stored key for {} ({})", creds.client_email, creds.project_id);
            }
        }
        CredentialsAction::Status => {
            let stored = vault.status().await?;
            let settings = load_settings().await;
            let in_use = AnyCredentialProvider::resolve(settings.credentials_path.as_deref()).source();
            match cli.format {
                OutputFormat::Text => {
                    let formatter = TextFormatter::new(!cli.no_color);
                    println!("{}", formatter.format_credentials(&stored, &in_use));
                }
                OutputFormat::Json => {
                    let output = StatusOutput { stored, in_use };
                    println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
                }
            }
        }
        CredentialsAction::Forget => {
            vault.forget_service_account().await?;
            if !cli.quiet {
                println!("Service-account key removed");
            }
        }
        CredentialsAction::Passphrase { value } => {
            vault.set_passphrase(value).await?;
            if !cli.quiet {
                println!(
                    "{}",
                    if value.is_empty() { "Passphrase removed" } else { "Passphrase stored" }
                );
            }
        }
    }

    Ok(())
}

//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use genlog_store::{SettingsStore, default_config_dir, default_output_dir, default_settings_path};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set one value. An empty value clears optional settings.
    Set {
        /// Setting name (see `config show`).
        key: String,
        /// New value. Lists are comma-separated.
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Set { key, value } => set_value(key, value, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await;
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_settings(&settings));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = default_settings_path();
    let output_dir = default_output_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
            println!("Image dir:     {}", output_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "output_dir": output_dir.display().to_string(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
        }
    }

    Ok(())
}

async fn set_value(key: &str, value: &str, cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await;
    store.set_key(key, value).await?;
    store.save().await?;

    info!(key, "Setting updated");
    if !cli.quiet {
        println!("{key} updated");
    }
    Ok(())
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await;
    store.reset().await;
    store.save().await?;

    info!(path = %store.path().display(), "Settings reset");
    if !cli.quiet {
        println!("Configuration reset to defaults");
    }
    Ok(())
}

// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! genlog CLI - prompt-to-image generation with a shared usage log.
//!
//! # Examples
//!
//! ```bash
//! # Generate an image and log it
//! genlog --user sato generate a lighthouse at dawn --ar 16:9
//!
//! # Brighten the prompt before sending it
//! genlog --user sato generate --brighten "cat, on the moon"
//!
//! # Show the last 20 log rows as JSON
//! genlog --format json --pretty log show --limit 20
//!
//! # Point genlog at a Drive folder
//! genlog config set drive_folder_id 1AbCdEf
//!
//! # Store a service-account key in the keychain
//! genlog credentials import ./key.json
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use genlog_core::CoreError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{check, config, credentials, decorate, generate, log};

// ============================================================================
// CLI Definition
// ============================================================================

/// genlog CLI - generate images and keep a usage log.
#[derive(Parser)]
#[command(name = "genlog")]
#[command(about = "Prompt-to-image generation with a shared usage log")]
#[command(long_about = r#"
genlog sends prompts to Vertex AI Imagen, saves the returned image and
appends one row per generation to a usage log kept in a Google Drive folder.

Examples:
  genlog --user sato generate a red fox --ar 4:3
  genlog decorate --brighten "cat, on the moon"
  genlog log show --limit 10
  genlog config set drive_folder_id 1AbCdEf
  genlog check
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// User id recorded in the usage log.
    #[arg(long, short, global = true)]
    pub user: Option<String>,

    /// Shared access passphrase, if one is configured.
    #[arg(long, global = true)]
    pub passphrase: Option<String>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Generate an image, archive it and log the prompt.
    #[command(visible_alias = "g")]
    Generate(generate::GenerateArgs),

    /// Print the prompt that would be sent.
    Decorate(decorate::DecorateArgs),

    /// Read or append to the usage log.
    Log(log::LogArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),

    /// Manage the service-account key and passphrase.
    Credentials(credentials::CredentialsArgs),

    /// Check credentials, token exchange and the Drive folder.
    Check,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Session refused (unknown user or wrong passphrase).
    Unauthorized = 2,
    /// Image produced, usage row not written.
    LoggingFailed = 3,
    /// The model answered without an image.
    NoImage = 4,
}

impl ExitCode {
    fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<CoreError>() {
            Some(CoreError::Unauthorized(_)) => Self::Unauthorized,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("genlog=debug,info")
    } else {
        EnvFilter::new("genlog=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result: Result<ExitCode> = match &cli.command {
        Commands::Generate(args) => generate::run(args, &cli).await,
        Commands::Decorate(args) => decorate::run(args, &cli).map(|()| ExitCode::Success),
        Commands::Log(args) => log::run(args, &cli).await.map(|()| ExitCode::Success),
        Commands::Config(args) => config::run(args, &cli).await.map(|()| ExitCode::Success),
        Commands::Credentials(args) => credentials::run(args, &cli)
            .await
            .map(|()| ExitCode::Success),
        Commands::Check => check::run(&cli).await.map(|()| ExitCode::Success),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::for_error(&e)
        }
    };

    if code != ExitCode::Success {
        std::process::exit(code as i32);
    }
}

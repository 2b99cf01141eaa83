//! Decorate command - show the prompt that would be sent.

use anyhow::Result;
use clap::Args;
use genlog_core::{aspect_directive, decorate};
use serde::Serialize;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the decorate command.
#[derive(Args)]
pub struct DecorateArgs {
    /// Add the lighting phrase.
    #[arg(long)]
    pub brighten: bool,

    /// Prompt, optionally ending in `--ar W:H`.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub prompt: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecorateOutput {
    prompt: String,
    decorated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
}

/// Runs the decorate command.
pub fn run(args: &DecorateArgs, cli: &Cli) -> Result<()> {
    let prompt = args.prompt.join(" ");
    let decorated = decorate(&prompt, args.brighten);

    match cli.format {
        OutputFormat::Text => println!("{decorated}"),
        OutputFormat::Json => {
            let output = DecorateOutput {
                aspect_ratio: aspect_directive(&prompt).map(|r| r.to_string()),
                prompt,
                decorated,
            };
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}

//! Generate command - the full prompt → image → archive → log workflow.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use genlog_core::{AspectRatio, GenerationParams};
use genlog_store::{
    GenerationOutcome, GenerationRequest, GenerationWorkflow, default_output_dir, write_numbered_file,
};
use tracing::{info, warn};

use super::{GoogleStack, load_settings, open_session, require_table};
use crate::output::{JsonFormatter, SaveResult, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the generate command.
#[derive(Args)]
pub struct GenerateArgs {
    /// Add the lighting phrase to the prompt.
    #[arg(long, conflicts_with = "no_brighten")]
    pub brighten: bool,

    /// Never add the lighting phrase, even if brightening is the default.
    #[arg(long)]
    pub no_brighten: bool,

    /// Aspect ratio (1:1, 3:4, 4:3, 9:16, 16:9). A `--ar` directive in the
    /// prompt wins.
    #[arg(long, short = 'a')]
    pub aspect_ratio: Option<AspectRatio>,

    /// What the image should not contain.
    #[arg(long, short = 'n')]
    pub negative: Option<String>,

    /// Seed for reproducible output.
    #[arg(long, short = 's')]
    pub seed: Option<u32>,

    /// Do not upload the image to the Drive folder.
    #[arg(long)]
    pub no_archive: bool,

    /// Directory the image is saved to.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Prompt. Everything after the first word belongs to it.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub prompt: Vec<String>,
}

impl GenerateArgs {
    /// The prompt as typed.
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }

    fn params(&self, default_ratio: AspectRatio) -> GenerationParams {
        let mut params =
            GenerationParams::default().with_aspect_ratio(self.aspect_ratio.unwrap_or(default_ratio));
        if let Some(negative) = &self.negative {
            params = params.with_negative_prompt(negative);
        }
        if let Some(seed) = self.seed {
            params = params.with_seed(seed);
        }
        params
    }
}

/// Runs the generate command.
pub async fn run(args: &GenerateArgs, cli: &Cli) -> Result<ExitCode> {
    let settings = load_settings().await;
    let table = require_table(&settings)?;
    let session = open_session(cli, &settings).await?;
    let google = GoogleStack::connect(&settings)?;

    let workflow = GenerationWorkflow::new(google.imagen(&settings), google.drive(), table)
        .with_archive(settings.archive_images && !args.no_archive)
        .with_retry(settings.log_retry());

    let brighten = args.brighten || (settings.brighten_by_default && !args.no_brighten);
    let request = GenerationRequest::new(args.prompt_text())
        .with_brighten(brighten)
        .with_params(args.params(settings.default_aspect_ratio));

    let outcome = workflow.run(&session, &request).await?;

    let saved = match (&outcome.image, &outcome.entry) {
        (Some(image), Some(entry)) => {
            let dir = args
                .out
                .clone()
                .or_else(|| settings.output_dir.clone())
                .unwrap_or_else(default_output_dir);
            let result = write_numbered_file(&dir, entry.artifact_name(), &image.data).await;
            Some(match result {
                Ok(path) => {
                    info!(path = %path.display(), "Image saved");
                    Ok(path)
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Saving image failed");
                    Err(format!("saving image to {}: {e}", dir.display()))
                }
            })
        }
        _ => None,
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_generation(&outcome, saved.as_ref()));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_generation(&outcome, saved.as_ref())?);
        }
    }

    Ok(exit_code(&outcome, saved.as_ref()))
}

/// Exit code for a finished generation. A missing image wins over a missing
/// row, which wins over a failed local save.
fn exit_code(outcome: &GenerationOutcome, saved: Option<&SaveResult>) -> ExitCode {
    if outcome.image.is_none() {
        ExitCode::NoImage
    } else if outcome.logging_failed() {
        ExitCode::LoggingFailed
    } else if matches!(saved, Some(Err(_))) {
        ExitCode::Error
    } else {
        ExitCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clap::Parser;
    use genlog_core::{GeneratedImage, ImageFormat, LogEntry};
    use genlog_store::{LogError, LogStatus};

    fn parse(args: &[&str]) -> GenerateArgs {
        let mut argv = vec!["genlog", "generate"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            crate::Commands::Generate(args) => args,
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_params_from_flags() {
        let args = parse(&["-a", "9:16", "-n", "text, watermark", "-s", "42", "a", "tower"]);
        let params = args.params(AspectRatio::Square);

        assert_eq!(params.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(params.negative_prompt.as_deref(), Some("text, watermark"));
        assert_eq!(params.seed, Some(42));
        assert_eq!(args.prompt_text(), "a tower");
    }

    #[test]
    fn test_params_fall_back_to_default_ratio() {
        let args = parse(&["a", "tower"]);
        let params = args.params(AspectRatio::Landscape);
        assert_eq!(params.aspect_ratio, AspectRatio::Landscape);
        assert!(params.seed.is_none());
    }

    fn outcome(log: Option<LogStatus>) -> GenerationOutcome {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let image = log
            .as_ref()
            .map(|_| GeneratedImage::new(vec![0x89, b'P', b'N', b'G'], ImageFormat::Png));
        GenerationOutcome {
            sent_prompt: "a tower".to_string(),
            params: GenerationParams::default(),
            entry: image
                .as_ref()
                .map(|_| LogEntry::for_artifact(ts, "sato", ImageFormat::Png, "a tower")),
            image,
            archive: None,
            log,
        }
    }

    #[test]
    fn test_exit_code_reflects_every_step() {
        let ok: SaveResult = Ok(PathBuf::from("/tmp/a.png"));
        let failed: SaveResult = Err("saving image to /ro: permission denied".to_string());
        let appended = Some(LogStatus::Appended { attempts: 1 });
        let not_logged = Some(LogStatus::Failed(LogError::WriteFailed("500".into())));

        assert_eq!(exit_code(&outcome(appended.clone()), Some(&ok)), ExitCode::Success);
        assert_eq!(exit_code(&outcome(appended), Some(&failed)), ExitCode::Error);
        assert_eq!(exit_code(&outcome(not_logged.clone()), Some(&failed)), ExitCode::LoggingFailed);
        assert_eq!(exit_code(&outcome(not_logged), Some(&ok)), ExitCode::LoggingFailed);
        assert_eq!(exit_code(&outcome(None), None), ExitCode::NoImage);
    }

    #[test]
    fn test_brighten_flags_conflict() {
        let argv = ["genlog", "generate", "--brighten", "--no-brighten", "x"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}

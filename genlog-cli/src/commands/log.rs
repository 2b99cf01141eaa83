//! Log command - read or append to the usage log.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use genlog_core::LogEntry;
use genlog_store::{append_with_retry, read_entries};
use tracing::info;

use super::{GoogleStack, load_settings, open_session, require_table};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the log command.
#[derive(Args)]
pub struct LogArgs {
    #[command(subcommand)]
    pub action: LogAction,
}

/// Log subcommands.
#[derive(Subcommand)]
pub enum LogAction {
    /// Print the usage log.
    Show {
        /// Only the most recent rows.
        #[arg(long, short = 'l')]
        limit: Option<usize>,
    },

    /// Append one row for an image produced elsewhere.
    Append {
        /// Image file name recorded in the row.
        #[arg(long)]
        artifact: String,

        /// Prompt text.
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
}

/// Runs the log command.
pub async fn run(args: &LogArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        LogAction::Show { limit } => show(*limit, cli).await,
        LogAction::Append { artifact, prompt } => append(artifact, &prompt.join(" "), cli).await,
    }
}

/// The last `limit` rows, or all of them.
fn tail(rows: &[LogEntry], limit: Option<usize>) -> &[LogEntry] {
    match limit {
        Some(n) => &rows[rows.len().saturating_sub(n)..],
        None => rows,
    }
}

async fn show(limit: Option<usize>, cli: &Cli) -> Result<()> {
    let settings = load_settings().await;
    let table = require_table(&settings)?;
    let drive = GoogleStack::connect(&settings)?.drive();

    let rows = read_entries(&table, &drive).await?;
    let rows = tail(&rows, limit);

    match cli.format {
        OutputFormat::Text => println!("{}", TextFormatter::new(!cli.no_color).format_rows(rows)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format_rows(rows)?),
    }
    Ok(())
}

async fn append(artifact: &str, prompt: &str, cli: &Cli) -> Result<()> {
    let settings = load_settings().await;
    let table = require_table(&settings)?;
    let session = open_session(cli, &settings).await?;
    let drive = GoogleStack::connect(&settings)?.drive();

    let entry = LogEntry::new(Utc::now(), session.user(), artifact, prompt);
    let attempts = append_with_retry(&entry, &table, &drive, &settings.log_retry()).await?;
    info!(attempts, "Row appended");

    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("Appended row for {}", entry.artifact_name());
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_rows(std::slice::from_ref(&entry))?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rows(n: u32) -> Vec<LogEntry> {
        (0..n)
            .map(|i| {
                let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, i).unwrap();
                LogEntry::new(ts, "kim", format!("{i}.png"), "x")
            })
            .collect()
    }

    #[test]
    fn test_tail_keeps_most_recent() {
        let all = rows(5);
        let last = tail(&all, Some(2));
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].artifact_name(), "3.png");
        assert_eq!(last[1].artifact_name(), "4.png");
    }

    #[test]
    fn test_tail_without_limit_or_oversized() {
        let all = rows(3);
        assert_eq!(tail(&all, None).len(), 3);
        assert_eq!(tail(&all, Some(10)).len(), 3);
        assert!(tail(&all, Some(0)).is_empty());
    }
}

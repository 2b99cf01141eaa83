//! Check command - verify the setup end to end.

use std::sync::Arc;

use anyhow::{Result, bail};
use genlog_core::{CredentialProvider, RemoteLogStore};
use genlog_fetch::HttpClient;
use genlog_fetch::google::{AnyCredentialProvider, DriveLogStore, TokenSource};
use genlog_store::Settings;

use super::load_settings;
use crate::output::{CheckStep, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the check command.
pub async fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings().await;
    let steps = collect(&settings).await;

    match cli.format {
        OutputFormat::Text => println!("{}", TextFormatter::new(!cli.no_color).format_check(&steps)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&steps)?),
    }

    let failed = steps.iter().filter(|s| !s.ok).count();
    if failed > 0 {
        bail!("{failed} check(s) failed");
    }
    Ok(())
}

/// Runs each step until one fails.
async fn collect(settings: &Settings) -> Vec<CheckStep> {
    let mut steps = Vec::new();

    let table = settings.log_table();
    steps.push(match &table {
        Some(t) => CheckStep::pass("settings", format!("log table {} in folder {}", t.name, t.container_id)),
        None => CheckStep::fail("settings", "drive_folder_id is not set"),
    });

    let provider = AnyCredentialProvider::resolve(settings.credentials_path.as_deref());
    let credentials = match provider.credentials() {
        Ok(c) => {
            steps.push(CheckStep::pass(
                "credentials",
                format!("{} from {}", c.client_email, provider.source()),
            ));
            c
        }
        Err(e) => {
            steps.push(CheckStep::fail("credentials", e.to_string()));
            return steps;
        }
    };

    let http = match HttpClient::for_google(settings.http_timeout()) {
        Ok(http) => http,
        Err(e) => {
            steps.push(CheckStep::fail("token", e.to_string()));
            return steps;
        }
    };
    let tokens = Arc::new(TokenSource::with_default_scopes(http.clone(), credentials));
    match tokens.access_token().await {
        Ok(_) => steps.push(CheckStep::pass("token", "token exchange succeeded")),
        Err(e) => {
            steps.push(CheckStep::fail("token", e.to_string()));
            return steps;
        }
    }

    let Some(table) = table else {
        return steps;
    };
    let drive = DriveLogStore::new(http, tokens);
    steps.push(match drive.list(&table.name, &table.container_id).await {
        Ok(found) => match found.len() {
            0 => CheckStep::pass("log table", "not created yet; the first generation creates it"),
            1 => CheckStep::pass("log table", format!("found ({})", found[0].id)),
            n => CheckStep::fail("log table", format!("{n} tables share the name; remove all but one")),
        },
        Err(e) => CheckStep::fail("log table", e.to_string()),
    });

    steps
}

//! Stores command - find stores and pick the one to shop at.

use anyhow::{Context, Result, bail};
use clap::Args;
use grocer_core::CatalogGateway;
use grocer_kroger::APP_SCOPE;
use grocer_store::{Settings, default_settings_path};
use tracing::info;

use super::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the stores command.
#[derive(Args)]
pub struct StoresArgs {
    /// ZIP code to search near. Defaults to the configured store's ZIP.
    #[arg(long, short)]
    pub zip: Option<String>,

    /// Save the Nth listed store as the store to shop at.
    #[arg(long, value_name = "N")]
    pub select: Option<usize>,
}

/// Runs the stores command.
pub async fn run(args: &StoresArgs, cli: &Cli) -> Result<()> {
    let app = App::load().await?;

    let zip = args
        .zip
        .clone()
        .or_else(|| {
            app.settings
                .store
                .as_ref()
                .map(|s| s.zip_code.clone())
                .filter(|z| !z.is_empty())
        })
        .context("No ZIP code given. Use --zip or set KROGER_ZIP_CODE")?;

    // Store lookup needs no user; an application token is enough.
    let token = app.tokens.application_token(&[APP_SCOPE.to_string()]).await?;
    let stores = app.gateway.list_stores(&zip, &token).await?;

    let selected = match args.select {
        None => app.settings.store_context().map(|s| s.store_id.clone()),
        Some(n) => {
            if n == 0 || n > stores.len() {
                bail!("--select must be between 1 and {}", stores.len());
            }
            let chosen = &stores[n - 1];

            // Save into the file as written; environment overrides stay out of it.
            let path = default_settings_path();
            let mut file_settings = Settings::load(&path).await;
            file_settings.store = Some(chosen.to_context());
            file_settings.save(&path).await?;
            info!(store_id = %chosen.store_id, name = %chosen.name, "Store selected");
            Some(chosen.store_id.clone())
        }
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_stores(&stores, selected.as_deref()));
            if args.select.is_some() && !cli.quiet {
                println!("\nSaved as the default store.");
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_stores(&stores, selected.as_deref())?);
        }
    }
    Ok(())
}

//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use grocer_store::{
    Settings, default_config_dir, default_credentials_dir, default_settings_path,
};
use serde_json::Value;
use tracing::info;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Shown in place of the client secret.
const MASK: &str = "********";

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus environment).
    Show,

    /// Show configuration paths.
    Path,

    /// Print one setting, e.g. `match_policy.min_confidence`.
    Get {
        /// Dotted setting key.
        key: String,
    },

    /// Change one setting in the settings file.
    Set {
        /// Dotted setting key.
        key: String,
        /// New value; JSON literals are accepted.
        value: String,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Get { key } => get_value(key, cli).await,
        ConfigAction::Set { key, value } => set_value(key, value, cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let settings = Settings::load_default().await;
    let mut value = serde_json::to_value(&settings)?;
    if let Some(secret) = value.get_mut("client_secret") {
        *secret = Value::String(MASK.to_string());
    }

    match cli.format {
        OutputFormat::Text => {
            println!("Grocer Configuration");
            println!("{}", "─".repeat(40));
            println!();
            let mut lines = Vec::new();
            flatten("", &value, &mut lines);
            for (key, val) in lines {
                println!("{key:<32} {val}");
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&value)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = default_settings_path();
    let credentials_dir = default_credentials_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:      {}", config_dir.display());
            println!("Settings file:   {}", settings_path.display());
            println!("Credentials dir: {}", credentials_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "credentials_dir": credentials_dir.display().to_string(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
        }
    }

    Ok(())
}

async fn get_value(key: &str, cli: &Cli) -> Result<()> {
    let settings = Settings::load_default().await;
    let mut value = settings.get_value(key)?;
    if key == "client_secret" && !value.is_null() {
        value = Value::String(MASK.to_string());
    }

    match cli.format {
        OutputFormat::Text => println!("{}", display_value(&value)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&value)?),
    }
    Ok(())
}

async fn set_value(key: &str, raw: &str, cli: &Cli) -> Result<()> {
    // Edit the file as written so environment overrides are not persisted.
    let path = default_settings_path();
    let mut settings = Settings::load(&path).await;
    settings.set_value(key, raw)?;
    settings.save(&path).await?;

    info!(key, "Setting updated");
    if !cli.quiet {
        let value = settings.get_value(key)?;
        let shown = if key == "client_secret" {
            MASK.to_string()
        } else {
            display_value(&value)
        };
        println!("{key} = {shown}");
    }
    Ok(())
}

/// Flattens nested objects into dotted keys.
fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        other => out.push((prefix.to_string(), display_value(other))),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(" "),
        Value::Null => "(unset)".to_string(),
        other => other.to_string(),
    }
}

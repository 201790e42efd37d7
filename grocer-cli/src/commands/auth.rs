//! Auth command - authorize, inspect and remove the stored credential.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use grocer_fetch::{
    AuthorizationRequest, CallbackError, CallbackListener, CodeReceiver, LoopbackReceiver,
    ManualEntryReceiver, RedirectPrompt,
};
use grocer_store::Settings;
use tracing::{info, warn};

use super::App;
use crate::output::{AuthStatusOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Auth subcommands.
#[derive(Subcommand)]
pub enum AuthAction {
    /// Authorize cart access through the browser.
    Login(LoginArgs),

    /// Show the stored credential.
    Status,

    /// Remove the stored credential.
    Logout,
}

/// Arguments for `auth login`.
#[derive(Args)]
pub struct LoginArgs {
    /// Paste the redirect URL instead of running the callback listener.
    #[arg(long)]
    pub manual: bool,

    /// Callback port; must match the redirect URI registered for the app.
    #[arg(long)]
    pub port: Option<u16>,

    /// Print only the authorization URL, without instructions.
    #[arg(long)]
    pub no_browser_hint: bool,
}

/// Runs the auth command.
pub async fn run(args: &AuthArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        AuthAction::Login(login_args) => login(login_args, cli).await,
        AuthAction::Status => status(cli).await,
        AuthAction::Logout => logout(cli).await,
    }
}

async fn login(args: &LoginArgs, cli: &Cli) -> Result<()> {
    let mut settings = Settings::load_default().await;
    if let Some(port) = args.port {
        settings.redirect_port = port;
    }
    let app = App::from_settings(settings)?;
    let port = app.settings.redirect_port;
    let path = app.settings.redirect_path.clone();

    let receiver: Box<dyn CodeReceiver> = if args.manual {
        Box::new(ManualEntryReceiver::new(port, &path, stdin_prompt()))
    } else {
        match CallbackListener::bind(port, &path) {
            Ok(listener) => Box::new(LoopbackReceiver::new(listener)),
            Err(e @ CallbackError::Bind { .. }) => {
                warn!(error = %e, "Callback listener unavailable, using manual entry");
                if !cli.quiet {
                    eprintln!("Port {port} is unavailable; you will paste the redirect URL instead.");
                }
                Box::new(ManualEntryReceiver::new(port, &path, stdin_prompt()))
            }
            Err(e) => return Err(e.into()),
        }
    };

    let hint = !args.no_browser_hint && !cli.quiet;
    let credential = app
        .tokens
        .authorize(receiver, &[], |request: &AuthorizationRequest| {
            if hint {
                eprintln!("Open this URL in your browser and approve access:\n");
            }
            eprintln!("{}", request.url);
            if hint {
                eprintln!("\nWaiting for the redirect to {} ...", request.redirect_uri);
            }
        })
        .await?;

    info!(expires_at = %credential.expires_at, "Authorized");

    let status = AuthStatusOutput::new(
        &app.settings.profile,
        app.tokens.store_location(),
        Some(&credential),
        Utc::now(),
    );
    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("Authorized. Credential saved to {}", status.location);
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&status)?);
        }
    }
    Ok(())
}

async fn status(cli: &Cli) -> Result<()> {
    let app = App::load().await?;
    let credential = app.tokens.credential();
    let status = AuthStatusOutput::new(
        &app.settings.profile,
        app.tokens.store_location(),
        credential.as_ref(),
        Utc::now(),
    );

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_auth_status(&status));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&status)?);
        }
    }
    Ok(())
}

async fn logout(cli: &Cli) -> Result<()> {
    let app = App::load().await?;
    app.tokens.logout()?;
    info!(profile = %app.settings.profile, "Logged out");

    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("Removed credential for profile {}", app.settings.profile);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "profile": app.settings.profile,
                "authorized": false,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}

/// Reads the pasted redirect URL from stdin.
fn stdin_prompt() -> RedirectPrompt {
    Box::new(|| {
        eprint!("Paste the full redirect URL from your browser: ");
        io::stderr().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
}

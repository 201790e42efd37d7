// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Grocer CLI - turn a grocery list into Kroger cart items.
//!
//! # Examples
//!
//! ```bash
//! # Authorize once (opens a local callback listener on port 8888)
//! grocer auth login
//!
//! # Pick a store near you
//! grocer stores --zip 97201 --select 1
//!
//! # See what a query would match
//! grocer search 2 lb ground beef
//!
//! # Add a list to the cart
//! grocer add "milk" "1 dozen eggs" "2 bananas"
//! grocer add --file groceries.txt
//!
//! # JSON output
//! grocer --format json --pretty add bread
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use grocer_core::CoreError;
use grocer_fetch::AuthFlowError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{add, auth, config, search, stores};

// ============================================================================
// CLI Definition
// ============================================================================

/// Grocer CLI - grocery lists to cart items.
#[derive(Parser)]
#[command(name = "grocer")]
#[command(about = "Turn grocery lists into Kroger cart items")]
#[command(long_about = r#"
Grocer matches free-text grocery items against a Kroger-family store's
catalog and adds the best match for each to your cart.

Setup:
  export KROGER_CLIENT_ID=...      # from developer.kroger.com
  export KROGER_CLIENT_SECRET=...
  grocer auth login                # authorize cart access
  grocer stores --zip 97201 --select 1

Examples:
  grocer search 1 gallon milk      # Preview the match
  grocer add milk eggs "2 bananas" # Add items to the cart
  grocer add --file list.txt       # One item per line
  grocer --format json add bread   # JSON output
"#)]
#[command(version)]
#[command(author = "Grocer Contributors")]
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
    /// Authorize, inspect or remove the stored credential.
    Auth(auth::AuthArgs),

    /// Find stores near a ZIP code.
    Stores(stores::StoresArgs),

    /// Show how a query matches the store's catalog.
    #[command(visible_alias = "s")]
    Search(search::SearchArgs),

    /// Add grocery items to the cart.
    #[command(visible_alias = "a")]
    Add(add::AddArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
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
    /// No usable credential; run `grocer auth login`.
    AuthRequired = 2,
    /// Some items were not added.
    PartialFailure = 3,
    /// Interrupted with Ctrl-C.
    Cancelled = 130,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    fn for_error(error: &anyhow::Error) -> Self {
        let needs_login = error
            .downcast_ref::<CoreError>()
            .is_some_and(CoreError::requires_authorization)
            || matches!(
                error.downcast_ref::<AuthFlowError>(),
                Some(AuthFlowError::SessionExpired | AuthFlowError::AccessDenied(_))
            );
        if needs_login {
            Self::AuthRequired
        } else {
            Self::Error
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
        EnvFilter::new("grocer=debug,info")
    } else {
        EnvFilter::new("grocer=warn")
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
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Auth(args) => auth::run(args, &cli).await.map(|()| ExitCode::Success),
        Commands::Stores(args) => stores::run(args, &cli).await.map(|()| ExitCode::Success),
        Commands::Search(args) => search::run(args, &cli).await.map(|()| ExitCode::Success),
        Commands::Add(args) => add::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await.map(|()| ExitCode::Success),
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::for_error(&e) as i32);
        }
    }
}

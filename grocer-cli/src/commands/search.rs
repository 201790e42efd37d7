//! Search command - preview how a query matches without touching the cart.

use anyhow::Result;
use clap::Args;
use grocer_core::GroceryRequest;

use super::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the search command.
#[derive(Args)]
pub struct SearchArgs {
    /// What to look for, e.g. `2 lb ground beef`.
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

/// Runs the search command.
pub async fn run(args: &SearchArgs, cli: &Cli) -> Result<()> {
    let request = GroceryRequest::parse(&args.query.join(" "))?;
    let app = App::load().await?;
    let context = app.store_context()?;

    let result = app.orchestrator().match_one(&request, &context).await?;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_match(&result));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&result)?);
        }
    }
    Ok(())
}

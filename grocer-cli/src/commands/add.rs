//! Add command - match a grocery list and put it in the cart.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use grocer_core::{BatchReport, CartMutationOutcome, GroceryRequest, StoreContext};
use grocer_fetch::{CANCELLED_DETAIL, CartOrchestrator, error_detail};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the add command.
#[derive(Args)]
pub struct AddArgs {
    /// Items to add, e.g. `milk` `"2 dozen eggs"`.
    pub items: Vec<String>,

    /// Read items from a file, one per line. Blank lines and `#` comments are skipped.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Match items and report what would be added without changing the cart.
    #[arg(long)]
    pub dry_run: bool,
}

/// Runs the add command.
pub async fn run(args: &AddArgs, cli: &Cli) -> Result<ExitCode> {
    let lines = collect_items(args).await?;
    if lines.is_empty() {
        bail!("No items given. Pass items as arguments or use --file");
    }
    let requests = lines
        .iter()
        .map(|line| {
            GroceryRequest::parse(line).with_context(|| format!("Could not understand {line:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let app = App::load().await?;
    let context = app.store_context()?;
    let orchestrator = app.orchestrator();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing items already in progress");
            let _ = cancel_tx.send(true);
        }
    });

    let report = if args.dry_run {
        preview(&orchestrator, requests, &context, &cancel_rx).await
    } else {
        orchestrator.run(requests, &context, cancel_rx).await
    };
    ctrl_c.abort();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_batch(&report, args.dry_run));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_batch(&report, args.dry_run)?);
        }
    }

    Ok(exit_code(&report))
}

/// Items from the command line followed by items from `--file`.
async fn collect_items(args: &AddArgs) -> Result<Vec<String>> {
    let mut items: Vec<String> = args
        .items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(path) = &args.file {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?;
        items.extend(parse_list(&content));
    }
    Ok(items)
}

/// One item per non-blank line; `#` starts a comment line.
fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Matches each request in order without adding anything.
async fn preview(
    orchestrator: &CartOrchestrator,
    requests: Vec<GroceryRequest>,
    context: &StoreContext,
    cancel: &watch::Receiver<bool>,
) -> BatchReport {
    let mut outcomes = Vec::with_capacity(requests.len());
    let mut interrupted_by: Option<String> = None;

    for request in requests {
        if let Some(kind) = &interrupted_by {
            outcomes.push(CartMutationOutcome::api_error(request, kind.clone()));
            continue;
        }
        if *cancel.borrow() {
            interrupted_by = Some(CANCELLED_DETAIL.to_string());
            outcomes.push(CartMutationOutcome::api_error(request, CANCELLED_DETAIL));
            continue;
        }

        let outcome = match orchestrator.match_one(&request, context).await {
            Ok(result) => match result.chosen.clone() {
                Some(product) => {
                    let mut outcome = CartMutationOutcome::added(request, product);
                    outcome.detail = outcome.detail.replacen("Added", "Would add", 1);
                    outcome
                }
                None => CartMutationOutcome::unmatched(result),
            },
            Err(e) => {
                debug!(term = %request.parsed_term, error = %e, "Preview failed");
                if e.requires_authorization() {
                    let kind = e.kind_name();
                    interrupted_by = Some(kind.to_string());
                    CartMutationOutcome::api_error(request, kind)
                } else {
                    CartMutationOutcome::api_error(request, error_detail(&e))
                }
            }
        };
        outcomes.push(outcome);
    }

    BatchReport {
        outcomes,
        interrupted_by,
    }
}

fn exit_code(report: &BatchReport) -> ExitCode {
    match report.interrupted_by.as_deref() {
        Some(CANCELLED_DETAIL) => ExitCode::Cancelled,
        Some(_) => ExitCode::AuthRequired,
        None if report.all_added() => ExitCode::Success,
        None => ExitCode::PartialFailure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_skips_blanks_and_comments() {
        let content = "# weekly list\nmilk\n\n  2 dozen eggs  \n# snacks\nbananas\n";
        assert_eq!(parse_list(content), vec!["milk", "2 dozen eggs", "bananas"]);
    }

    #[test]
    fn test_exit_codes() {
        let added = CartMutationOutcome::added(
            GroceryRequest::new("milk"),
            grocer_core::CandidateProduct::new("1", "Whole Milk"),
        );
        let failed = CartMutationOutcome::api_error(GroceryRequest::new("bread"), "RemoteUnavailable");

        let all = BatchReport {
            outcomes: vec![added.clone()],
            interrupted_by: None,
        };
        assert_eq!(exit_code(&all), ExitCode::Success);

        let partial = BatchReport {
            outcomes: vec![added.clone(), failed.clone()],
            interrupted_by: None,
        };
        assert_eq!(exit_code(&partial), ExitCode::PartialFailure);

        let halted = BatchReport {
            outcomes: vec![added.clone(), failed.clone()],
            interrupted_by: Some("ReauthorizationRequired".to_string()),
        };
        assert_eq!(exit_code(&halted), ExitCode::AuthRequired);

        let cancelled = BatchReport {
            outcomes: vec![added, failed],
            interrupted_by: Some(CANCELLED_DETAIL.to_string()),
        };
        assert_eq!(exit_code(&cancelled), ExitCode::Cancelled);
    }
}

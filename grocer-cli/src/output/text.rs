//! Text output formatting with colors.

use chrono::{DateTime, Local, Utc};
use grocer_core::{
    BatchReport, CandidateProduct, CartMutationOutcome, GroceryRequest, MatchResult,
    OutcomeStatus, StoreLocation,
};

use super::json::{AuthStatusOutput, BatchSummary};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Alternates shown under an ambiguous item.
const MAX_ALTERNATES: usize = 5;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ------------------------------------------------------------------------
    // Cart
    // ------------------------------------------------------------------------

    /// Formats one batch outcome.
    pub fn format_outcome(&self, outcome: &CartMutationOutcome) -> String {
        let label = self.bold(&outcome.request.raw_text);
        let mut lines = Vec::new();

        match outcome.status {
            OutcomeStatus::Added => {
                let product = outcome
                    .product
                    .as_ref()
                    .map(CandidateProduct::summary)
                    .unwrap_or_default();
                lines.push(format!(
                    "{} {label} → {} x {product}",
                    self.green("✓"),
                    outcome.request.cart_quantity
                ));
            }
            OutcomeStatus::Ambiguous => {
                lines.push(format!("{} {label}: {}", self.yellow("?"), outcome.detail));
                for (i, alt) in outcome.alternates.iter().take(MAX_ALTERNATES).enumerate() {
                    lines.push(format!("    {}. {}", i + 1, alt.summary()));
                }
            }
            OutcomeStatus::NotFound => {
                lines.push(format!("{} {label}: {}", self.yellow("✗"), outcome.detail));
            }
            OutcomeStatus::ApiError => {
                lines.push(format!("{} {label}: {}", self.red("✗"), self.red(&outcome.detail)));
            }
        }

        lines.join("\n")
    }

    /// Formats a batch report: one block per item, then a summary line.
    pub fn format_batch(&self, report: &BatchReport, dry_run: bool) -> String {
        let mut lines: Vec<String> = report
            .outcomes
            .iter()
            .map(|o| self.format_outcome(o))
            .collect();

        lines.push(String::new());
        lines.push(self.format_summary(&BatchSummary::from_report(report), dry_run));

        if let Some(kind) = &report.interrupted_by {
            let hint = if kind == grocer_fetch::CANCELLED_DETAIL {
                "Interrupted; remaining items were not processed.".to_string()
            } else {
                format!("Stopped after {kind}. Run `grocer auth login` and retry the remaining items.")
            };
            lines.push(self.red(&hint));
        }

        lines.join("\n")
    }

    fn format_summary(&self, summary: &BatchSummary, dry_run: bool) -> String {
        let verb = if dry_run { "would add" } else { "added" };
        let mut parts = vec![self.green(&format!("{} {verb}", summary.added))];
        if summary.ambiguous > 0 {
            parts.push(self.yellow(&format!("{} ambiguous", summary.ambiguous)));
        }
        if summary.not_found > 0 {
            parts.push(self.yellow(&format!("{} not found", summary.not_found)));
        }
        if summary.api_error > 0 {
            parts.push(self.red(&format!("{} failed", summary.api_error)));
        }
        format!("{} of {} items: {}", self.bold("Cart"), summary.total, parts.join(", "))
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Formats a match result with its ranked candidates.
    pub fn format_match(&self, result: &MatchResult) -> String {
        let mut lines = vec![self.format_request(&result.request)];

        match &result.chosen {
            Some(product) => {
                lines.push(format!(
                    "{} {} {}",
                    self.green("Best:"),
                    product.summary(),
                    self.dim(&format!("[{}]", product.product_id))
                ));
                lines.push(format!("Confidence: {:.2}", result.confidence));
            }
            None if result.all_out_of_stock => {
                lines.push(self.yellow("Every match is out of stock"));
            }
            None if result.alternates.is_empty() => {
                lines.push(self.yellow("No matching products"));
            }
            None => {
                lines.push(format!(
                    "{} (confidence {:.2})",
                    self.yellow("No confident choice"),
                    result.confidence
                ));
            }
        }

        if !result.alternates.is_empty() {
            lines.push(String::new());
            lines.push(self.dim("Candidates:"));
            for (i, alt) in result.alternates.iter().enumerate() {
                lines.push(format!(
                    "  {:>2}. {} {}",
                    i + 1,
                    alt.summary(),
                    self.dim(&format!("[{}]", alt.product_id))
                ));
            }
        }

        lines.join("\n")
    }

    /// Formats how a request was understood.
    pub fn format_request(&self, request: &GroceryRequest) -> String {
        let mut line = format!("Searching for {}", self.cyan(&request.parsed_term));
        if let Some(size) = request.desired_size() {
            line.push_str(&format!(", size {size}"));
        }
        if request.cart_quantity > 1 {
            line.push_str(&format!(", quantity {}", request.cart_quantity));
        }
        line
    }

    // ------------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------------

    /// Formats a numbered store list, marking the selected store.
    pub fn format_stores(&self, stores: &[StoreLocation], selected: Option<&str>) -> String {
        if stores.is_empty() {
            return self.yellow("No stores found");
        }

        let mut lines = Vec::new();
        for (i, store) in stores.iter().enumerate() {
            let marker = if selected == Some(store.store_id.as_str()) {
                self.green(" ✓")
            } else {
                String::new()
            };
            lines.push(format!(
                "{:>2}. {} {}{marker}",
                i + 1,
                self.bold(&store.name),
                self.dim(&format!("[{}]", store.store_id))
            ));
            if !store.address.is_empty() {
                lines.push(format!("    {}", store.address));
            }
        }
        lines.join("\n")
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    /// Formats credential status.
    pub fn format_auth_status(&self, status: &AuthStatusOutput) -> String {
        let mut lines = vec![format!("Profile: {}", self.bold(&status.profile))];

        if !status.authorized {
            lines.push(format!("Status:  {}", self.yellow("not authorized")));
            lines.push(self.dim("Run `grocer auth login` to authorize cart access."));
            return lines.join("\n");
        }

        let state = if !status.expired {
            self.green("authorized")
        } else if status.can_refresh {
            self.yellow("access token expired (will refresh)")
        } else {
            self.red("expired")
        };
        lines.push(format!("Status:  {state}"));

        if let Some(expires_at) = status.expires_at {
            lines.push(format!("Expires: {}", format_time(expires_at)));
        }
        if let Some(client_id) = &status.client_id {
            lines.push(format!("Client:  {client_id}"));
        }
        if !status.scopes.is_empty() {
            lines.push(format!("Scopes:  {}", status.scopes.join(" ")));
        }
        lines.push(format!("Stored:  {}", self.dim(&status.location)));

        lines.join("\n")
    }

    // ------------------------------------------------------------------------
    // Color Helpers
    // ------------------------------------------------------------------------

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

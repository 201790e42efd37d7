//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use grocer_core::{BatchReport, CartMutationOutcome, Credential, OutcomeStatus, StoreLocation};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// Credential state for `auth status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusOutput {
    pub profile: String,
    pub authorized: bool,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub can_refresh: bool,
    pub scopes: Vec<String>,
}

impl AuthStatusOutput {
    /// Builds the status for `credential` as of `now`.
    pub fn new(
        profile: &str,
        location: String,
        credential: Option<&Credential>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            profile: profile.to_string(),
            authorized: credential.is_some(),
            location,
            client_id: credential.map(|c| c.client_id.clone()),
            expires_at: credential.map(|c| c.expires_at),
            expired: credential.is_some_and(|c| c.expires_at <= now),
            can_refresh: credential.is_some_and(Credential::can_refresh),
            scopes: credential
                .map(|c| c.scopes.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// Per-status counts for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub added: usize,
    pub ambiguous: usize,
    pub not_found: usize,
    pub api_error: usize,
}

impl BatchSummary {
    /// Counts outcomes by status.
    pub fn from_report(report: &BatchReport) -> Self {
        Self {
            total: report.outcomes.len(),
            added: report.count(OutcomeStatus::Added),
            ambiguous: report.count(OutcomeStatus::Ambiguous),
            not_found: report.count(OutcomeStatus::NotFound),
            api_error: report.count(OutcomeStatus::ApiError),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchOutput<'a> {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    dry_run: bool,
    summary: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    interrupted_by: Option<&'a str>,
    outcomes: &'a [CartMutationOutcome],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreOutput<'a> {
    index: usize,
    selected: bool,
    #[serde(flatten)]
    location: &'a StoreLocation,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON output formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a batch report with its summary counts.
    pub fn format_batch(&self, report: &BatchReport, dry_run: bool) -> Result<String> {
        self.format(&BatchOutput {
            dry_run,
            summary: BatchSummary::from_report(report),
            interrupted_by: report.interrupted_by.as_deref(),
            outcomes: &report.outcomes,
        })
    }

    /// Formats a numbered store list; `selected` is the chosen store id.
    pub fn format_stores(&self, stores: &[StoreLocation], selected: Option<&str>) -> Result<String> {
        let outputs: Vec<StoreOutput<'_>> = stores
            .iter()
            .enumerate()
            .map(|(i, location)| StoreOutput {
                index: i + 1,
                selected: selected == Some(location.store_id.as_str()),
                location,
            })
            .collect();
        self.format(&outputs)
    }
}

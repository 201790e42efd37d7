//! Match and cart mutation results.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::product::CandidateProduct;
use super::request::GroceryRequest;

// ============================================================================
// Match Result
// ============================================================================

/// Output of the match engine for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The request that was matched.
    pub request: GroceryRequest,
    /// The confidently chosen product, if any.
    pub chosen: Option<CandidateProduct>,
    /// Score of the chosen product, or the top-two gap when nothing was chosen.
    pub confidence: f64,
    /// Ranked runners-up (or the top candidates when nothing was chosen).
    pub alternates: Vec<CandidateProduct>,
    /// Every candidate was out of stock.
    #[serde(default)]
    pub all_out_of_stock: bool,
}

impl MatchResult {
    /// A result with no candidates at all.
    pub fn empty(request: GroceryRequest) -> Self {
        Self {
            request,
            chosen: None,
            confidence: 0.0,
            alternates: Vec::new(),
            all_out_of_stock: false,
        }
    }

    /// Returns true if a product was chosen.
    pub fn is_confident(&self) -> bool {
        self.chosen.is_some()
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Per-item status of a cart mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Product chosen and added to the cart.
    Added,
    /// No confident choice; alternates attached.
    Ambiguous,
    /// No candidates, or only out-of-stock candidates.
    NotFound,
    /// A remote or authorization failure.
    ApiError,
}

impl OutcomeStatus {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Ambiguous => "ambiguous",
            Self::NotFound => "not_found",
            Self::ApiError => "api_error",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one request in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartMutationOutcome {
    /// The request.
    pub request: GroceryRequest,
    /// Status.
    pub status: OutcomeStatus,
    /// Human-readable detail. For `api_error` this is `Kind: message`, or the
    /// bare kind name when the batch was halted or cancelled.
    #[serde(default)]
    pub detail: String,
    /// Product that was chosen, when one was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<CandidateProduct>,
    /// Alternates offered for disambiguation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<CandidateProduct>,
}

impl CartMutationOutcome {
    /// An `added` outcome.
    pub fn added(request: GroceryRequest, product: CandidateProduct) -> Self {
        let detail = format!("Added {} x {}", request.cart_quantity, product.summary());
        Self {
            request,
            status: OutcomeStatus::Added,
            detail,
            product: Some(product),
            alternates: Vec::new(),
        }
    }

    /// An `api_error` outcome with the given detail.
    pub fn api_error(request: GroceryRequest, detail: impl Into<String>) -> Self {
        Self {
            request,
            status: OutcomeStatus::ApiError,
            detail: detail.into(),
            product: None,
            alternates: Vec::new(),
        }
    }

    /// Outcome for a match result without a confident choice.
    ///
    /// `not_found` when there were no candidates or all were out of stock,
    /// otherwise `ambiguous` with the alternates attached.
    pub fn unmatched(result: MatchResult) -> Self {
        let (status, detail) = if result.all_out_of_stock {
            (
                OutcomeStatus::NotFound,
                "All matching products are out of stock".to_string(),
            )
        } else if result.alternates.is_empty() {
            (OutcomeStatus::NotFound, "No matching products".to_string())
        } else {
            (
                OutcomeStatus::Ambiguous,
                format!(
                    "{} candidates, no confident choice (confidence {:.2})",
                    result.alternates.len(),
                    result.confidence
                ),
            )
        };
        Self {
            request: result.request,
            status,
            detail,
            product: None,
            alternates: result.alternates,
        }
    }

    /// Returns true if the item was added.
    pub fn is_added(&self) -> bool {
        self.status == OutcomeStatus::Added
    }
}

// ============================================================================
// Batch Report
// ============================================================================

/// Outcomes of a batch, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One outcome per request.
    pub outcomes: Vec<CartMutationOutcome>,
    /// Error kind that halted the batch, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted_by: Option<String>,
}

impl BatchReport {
    /// Number of outcomes with the given status.
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Returns true if every item was added.
    pub fn all_added(&self) -> bool {
        self.outcomes.iter().all(CartMutationOutcome::is_added)
    }
}

//! Product match engine.
//!
//! Ranks catalog candidates against a [`GroceryRequest`] and decides whether
//! one of them is a confident choice. Ranking is a weighted sum of three
//! signals:
//!
//! - **text**: overlap between the query term and the candidate's
//!   description and brand, mostly recall of the query tokens
//! - **unit**: pack-size compatibility when the query names a unit
//! - **remote**: the provider's own relevance score, when it sends one
//!
//! Ordering is total (score, then price, then product id), so the same
//! inputs always produce the same result.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::CoreError;
use crate::models::{CandidateProduct, GroceryRequest, MatchResult, SizeFit};
use crate::query::tokenize;

const RECALL_SHARE: f64 = 0.85;
const PRECISION_SHARE: f64 = 0.15;

const EXACT_SIZE_SCORE: f64 = 1.0;
const SAME_DIMENSION_SCORE: f64 = 0.4;
const INCOMPATIBLE_SIZE_SCORE: f64 = -1.0;

// ============================================================================
// Policy
// ============================================================================

/// Weights and thresholds for the match engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Weight of textual relevance.
    pub text_weight: f64,
    /// Weight of pack-size compatibility.
    pub unit_weight: f64,
    /// Weight of the provider's relevance score.
    pub remote_weight: f64,
    /// Minimum top score for a confident choice.
    pub confidence_threshold: f64,
    /// Minimum lead of the top score over the runner-up.
    pub min_margin: f64,
    /// Maximum alternates reported.
    pub max_alternates: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            text_weight: 0.6,
            unit_weight: 0.25,
            remote_weight: 0.15,
            confidence_threshold: 0.45,
            min_margin: 0.1,
            max_alternates: 3,
        }
    }
}

impl MatchPolicy {
    /// Checks that weights are non-negative and thresholds are in `[0, 1]`.
    pub fn validate(&self) -> Result<(), CoreError> {
        let weights = [self.text_weight, self.unit_weight, self.remote_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CoreError::InvalidConfig(
                "match weights must be non-negative".to_string(),
            ));
        }
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("min_margin", self.min_margin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Scores and sorts candidates, best first.
    pub fn rank(
        &self,
        request: &GroceryRequest,
        candidates: &[CandidateProduct],
    ) -> Vec<ScoredCandidate> {
        let query: BTreeSet<String> = tokenize(&request.parsed_term).into_iter().collect();

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .map(|product| self.score(request, &query, product))
            .collect();
        scored.sort_by(compare_ranked);
        scored
    }

    /// Picks the best candidate for `request`, or reports why none was picked.
    pub fn select_best_match(
        &self,
        request: &GroceryRequest,
        candidates: &[CandidateProduct],
    ) -> MatchResult {
        if candidates.is_empty() {
            return MatchResult::empty(request.clone());
        }

        let in_stock: Vec<CandidateProduct> =
            candidates.iter().filter(|c| c.in_stock).cloned().collect();

        if in_stock.is_empty() {
            let ranked = self.rank(request, candidates);
            debug!(
                term = %request.parsed_term,
                candidates = candidates.len(),
                "All candidates out of stock"
            );
            return MatchResult {
                request: request.clone(),
                chosen: None,
                confidence: 0.0,
                alternates: self.top(ranked),
                all_out_of_stock: true,
            };
        }

        let ranked = self.rank(request, &in_stock);
        let top_score = ranked[0].score;

        if ranked.len() == 1 {
            let confidence = top_score.clamp(0.0, 1.0);
            let chosen = ranked.into_iter().next().map(|s| s.product);
            return MatchResult {
                request: request.clone(),
                chosen,
                confidence,
                alternates: Vec::new(),
                all_out_of_stock: false,
            };
        }

        let gap = top_score - ranked[1].score;
        let confident = top_score >= self.confidence_threshold && gap >= self.min_margin;

        debug!(
            term = %request.parsed_term,
            top = top_score,
            gap,
            confident,
            "Ranked candidates"
        );

        if confident {
            let mut iter = ranked.into_iter();
            let chosen = iter.next().map(|s| s.product);
            MatchResult {
                request: request.clone(),
                chosen,
                confidence: top_score.clamp(0.0, 1.0),
                alternates: iter.take(self.max_alternates).map(|s| s.product).collect(),
                all_out_of_stock: false,
            }
        } else {
            MatchResult {
                request: request.clone(),
                chosen: None,
                confidence: gap.clamp(0.0, 1.0),
                alternates: self.top(ranked),
                all_out_of_stock: false,
            }
        }
    }

    fn top(&self, ranked: Vec<ScoredCandidate>) -> Vec<CandidateProduct> {
        ranked
            .into_iter()
            .take(self.max_alternates)
            .map(|s| s.product)
            .collect()
    }

    fn score(
        &self,
        request: &GroceryRequest,
        query: &BTreeSet<String>,
        product: &CandidateProduct,
    ) -> ScoredCandidate {
        let text = text_score(query, product);
        let unit = unit_score(request, product);
        let remote = product.relevance_score.unwrap_or(0.0).clamp(0.0, 1.0);

        ScoredCandidate {
            score: self.text_weight * text + self.unit_weight * unit + self.remote_weight * remote,
            text,
            unit,
            product: product.clone(),
        }
    }
}

/// Ranks with the default policy.
pub fn select_best_match(request: &GroceryRequest, candidates: &[CandidateProduct]) -> MatchResult {
    MatchPolicy::default().select_best_match(request, candidates)
}

// ============================================================================
// Scoring
// ============================================================================

/// A candidate with its score breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Weighted total.
    pub score: f64,
    /// Text relevance in `[0, 1]`.
    pub text: f64,
    /// Size compatibility in `[-1, 1]`.
    pub unit: f64,
    /// The candidate.
    pub product: CandidateProduct,
}

fn text_score(query: &BTreeSet<String>, product: &CandidateProduct) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let haystack = format!("{} {}", product.description, product.brand);
    let tokens: BTreeSet<String> = tokenize(&haystack).into_iter().collect();
    if tokens.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let (hits, q, c) = (
        query.intersection(&tokens).count() as f64,
        query.len() as f64,
        tokens.len() as f64,
    );
    RECALL_SHARE * (hits / q) + PRECISION_SHARE * (hits / c)
}

fn unit_score(request: &GroceryRequest, product: &CandidateProduct) -> f64 {
    let (Some(desired), Some(actual)) = (request.desired_size(), product.pack_size) else {
        return 0.0;
    };
    match desired.fit(&actual) {
        SizeFit::Exact => EXACT_SIZE_SCORE,
        SizeFit::SameDimension => SAME_DIMENSION_SCORE,
        SizeFit::Incompatible => INCOMPATIBLE_SIZE_SCORE,
    }
}

/// Score descending, then known price ascending, then product id.
fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.product.price, b.product.price) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.product.product_id.cmp(&b.product.product_id))
}

// ============================================================================
// Tests
// ============================================================================

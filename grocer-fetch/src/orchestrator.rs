//! Batch cart fulfilment.
//!
//! For each [`GroceryRequest`]: search the store's catalog, rank the
//! candidates, and add the chosen product to the cart. Requests are
//! independent; a failure in one becomes that item's outcome and the batch
//! continues. Only authorization failures halt the batch, since every later
//! call would fail the same way.

use futures::future::join_all;
use grocer_core::{
    BatchReport, CartMutationOutcome, CatalogGateway, CoreError, GroceryRequest, MatchPolicy,
    MatchResult, StoreContext,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::token::TokenManager;

/// Detail recorded for requests that never started because of cancellation.
pub const CANCELLED_DETAIL: &str = "Cancelled";

// ============================================================================
// Configuration
// ============================================================================

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Requests processed at once.
    pub concurrency: usize,
    /// Minimum spacing between gateway calls.
    pub min_call_interval: Duration,
    /// Match engine policy.
    pub policy: MatchPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            min_call_interval: Duration::from_millis(250),
            policy: MatchPolicy::default(),
        }
    }
}

// ============================================================================
// Call Pacer
// ============================================================================

/// Spaces successive calls by a minimum interval.
#[derive(Debug)]
struct CallPacer {
    interval: Duration,
    last: tokio::sync::Mutex<Option<Instant>>,
}

impl CallPacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: tokio::sync::Mutex::new(None),
        }
    }

    async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs search, match and add for batches of requests.
#[derive(Clone)]
pub struct CartOrchestrator {
    gateway: Arc<dyn CatalogGateway>,
    tokens: TokenManager,
    config: OrchestratorConfig,
    pacer: Arc<CallPacer>,
}

impl std::fmt::Debug for CartOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartOrchestrator")
            .field("tokens", &self.tokens)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CartOrchestrator {
    /// Creates an orchestrator.
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        tokens: TokenManager,
        config: OrchestratorConfig,
    ) -> Self {
        let pacer = Arc::new(CallPacer::new(config.min_call_interval));
        Self {
            gateway,
            tokens,
            config,
            pacer,
        }
    }

    /// Token manager used for every call.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Processes a batch to completion and returns one outcome per request.
    pub async fn fulfill_batch(
        &self,
        requests: Vec<GroceryRequest>,
        context: &StoreContext,
    ) -> Vec<CartMutationOutcome> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run(requests, context, cancel_rx).await.outcomes
    }

    /// Processes a batch, stopping new work when `cancel` becomes true.
    ///
    /// Requests already in flight finish; requests not yet started are
    /// reported as `api_error` with detail `Cancelled`. Outcomes are in
    /// request order.
    #[instrument(skip_all, fields(items = requests.len(), store = %context.store_id))]
    pub async fn run(
        &self,
        requests: Vec<GroceryRequest>,
        context: &StoreContext,
        cancel: watch::Receiver<bool>,
    ) -> BatchReport {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let halted: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let tasks = requests.into_iter().map(|request| {
            let semaphore = Arc::clone(&semaphore);
            let halted = Arc::clone(&halted);
            let cancel = cancel.clone();
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return CartMutationOutcome::api_error(request, CANCELLED_DETAIL);
                };

                if *cancel.borrow() {
                    return CartMutationOutcome::api_error(request, CANCELLED_DETAIL);
                }
                let halt_kind = halted
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(kind) = halt_kind {
                    return CartMutationOutcome::api_error(request, kind);
                }

                match self.fulfill_one(&request, context).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let kind = e.kind_name();
                        if e.requires_authorization() {
                            warn!(error = %e, "Authorization lost; halting batch");
                            halted
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .get_or_insert_with(|| kind.to_string());
                            CartMutationOutcome::api_error(request, kind)
                        } else {
                            warn!(term = %request.parsed_term, error = %e, "Item failed");
                            CartMutationOutcome::api_error(request, error_detail(&e))
                        }
                    }
                }
            }
        });

        let outcomes = join_all(tasks).await;

        let mut interrupted_by = halted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if interrupted_by.is_none()
            && *cancel.borrow()
            && outcomes.iter().any(|o| o.detail == CANCELLED_DETAIL)
        {
            interrupted_by = Some(CANCELLED_DETAIL.to_string());
        }

        let report = BatchReport {
            outcomes,
            interrupted_by,
        };
        info!(
            added = report.count(grocer_core::OutcomeStatus::Added),
            total = report.outcomes.len(),
            "Batch finished"
        );
        report
    }

    /// Searches and ranks candidates for one request without touching the cart.
    pub async fn match_one(
        &self,
        request: &GroceryRequest,
        context: &StoreContext,
    ) -> Result<MatchResult, CoreError> {
        let gateway = &self.gateway;
        let term = request.parsed_term.as_str();
        let store_id = context.store_id.as_str();

        let pacer = &self.pacer;
        let candidates = self
            .tokens
            .call(move |token| async move {
                pacer.wait().await;
                gateway.search_products(term, store_id, &token).await
            })
            .await?;
        debug!(term, candidates = candidates.len(), "Search complete");

        Ok(self.config.policy.select_best_match(request, &candidates))
    }

    /// Search, match and add for one request.
    async fn fulfill_one(
        &self,
        request: &GroceryRequest,
        context: &StoreContext,
    ) -> Result<CartMutationOutcome, CoreError> {
        let result = self.match_one(request, context).await?;
        let Some(product) = result.chosen.clone() else {
            return Ok(CartMutationOutcome::unmatched(result));
        };

        let gateway = &self.gateway;
        let product_id = product.product_id.as_str();
        let quantity = request.cart_quantity;

        let pacer = &self.pacer;
        self.tokens
            .call(move |token| async move {
                pacer.wait().await;
                gateway.add_to_cart(product_id, quantity, &token).await
            })
            .await?;

        info!(product_id, quantity, "Added to cart");
        Ok(CartMutationOutcome::added(request.clone(), product))
    }
}

/// Outcome detail for a failed item, e.g. `RemoteRejected: ...`.
pub fn error_detail(error: &CoreError) -> String {
    format!("{}: {error}", error.kind_name())
}

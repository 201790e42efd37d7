//! Kroger catalog and cart API client.
//!
//! Implements [`CatalogGateway`] over the Kroger public API.

use async_trait::async_trait;
use grocer_core::{CandidateProduct, CatalogGateway, CoreError, StoreLocation};
use grocer_fetch::{HttpClient, HttpError};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::KrogerError;
use crate::parser::{parse_locations, parse_products};

// ============================================================================
// Constants
// ============================================================================

/// Kroger public API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.kroger.com/v1";

/// Chain filter for store lookups.
pub const DEFAULT_CHAIN: &str = "FRED MEYER";

/// Products requested per search.
const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Stores requested per location lookup.
const DEFAULT_STORE_LIMIT: u32 = 5;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CartRequest<'a> {
    items: [CartItem<'a>; 1],
}

#[derive(Debug, Serialize)]
struct CartItem<'a> {
    upc: &'a str,
    quantity: u32,
}

// ============================================================================
// Gateway
// ============================================================================

/// Kroger catalog, cart, and location gateway.
#[derive(Debug, Clone)]
pub struct KrogerGateway {
    http: HttpClient,
    base_url: String,
    chain: String,
    search_limit: u32,
    store_limit: u32,
}

impl KrogerGateway {
    /// Creates a gateway against the production API.
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, DEFAULT_API_BASE)
    }

    /// Creates a gateway against a custom API base URL.
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chain: DEFAULT_CHAIN.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            store_limit: DEFAULT_STORE_LIMIT,
        }
    }

    /// Sets the chain filter for store lookups. Empty disables the filter.
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = chain.into();
        self
    }

    /// Sets how many products a search returns.
    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    /// API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<String, KrogerError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .execute(|client| client.get(&url).query(query).bearer_auth(token))
            .await?;
        Ok(response.text().await.map_err(HttpError::from)?)
    }
}

#[async_trait]
impl CatalogGateway for KrogerGateway {
    #[instrument(skip(self, token))]
    async fn search_products(
        &self,
        term: &str,
        store_id: &str,
        token: &str,
    ) -> Result<Vec<CandidateProduct>, CoreError> {
        let query = [
            ("filter.term", term.to_string()),
            ("filter.locationId", store_id.to_string()),
            ("filter.limit", self.search_limit.to_string()),
        ];
        let body = self.get_text("/products", &query, token).await?;
        Ok(parse_products(&body)?)
    }

    #[instrument(skip(self, token))]
    async fn add_to_cart(&self, product_id: &str, quantity: u32, token: &str) -> Result<(), CoreError> {
        let url = format!("{}/cart/add", self.base_url);
        let body = CartRequest {
            items: [CartItem {
                upc: product_id,
                quantity,
            }],
        };
        let response = self
            .http
            .put_json(&url, &body, token)
            .await
            .map_err(KrogerError::from)?;
        debug!(status = %response.status(), "Cart updated");
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn list_stores(&self, zip_code: &str, token: &str) -> Result<Vec<StoreLocation>, CoreError> {
        let mut query = vec![
            ("filter.zipCode.near", zip_code.to_string()),
            ("filter.limit", self.store_limit.to_string()),
        ];
        if !self.chain.is_empty() {
            query.push(("filter.chain", self.chain.clone()));
        }
        let body = self.get_text("/locations", &query, token).await?;
        Ok(parse_locations(&body)?)
    }
}

//! Trait definitions for Grocer.
//!
//! These are the seams between the engine and the outside world: the
//! grocery catalog, the OAuth2 token endpoint, and credential persistence.
//! Concrete implementations live in `grocer-kroger` and `grocer-store`;
//! tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{CandidateProduct, ClientCredentials, Credential, StoreLocation, TokenGrant};

/// Remote catalog and cart operations.
///
/// Every call takes the bearer token explicitly. A rejected token must be
/// reported as [`CoreError::Unauthorized`] so callers can refresh and retry.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Searches the catalog of one store.
    async fn search_products(
        &self,
        term: &str,
        store_id: &str,
        token: &str,
    ) -> Result<Vec<CandidateProduct>, CoreError>;

    /// Adds `quantity` of a product to the user's cart.
    async fn add_to_cart(
        &self,
        product_id: &str,
        quantity: u32,
        token: &str,
    ) -> Result<(), CoreError>;

    /// Lists stores near a ZIP code.
    async fn list_stores(&self, zip_code: &str, token: &str)
    -> Result<Vec<StoreLocation>, CoreError>;
}

/// OAuth2 token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Client credentials used for every grant.
    fn client(&self) -> &ClientCredentials;

    /// Builds the URL the user opens to authorize.
    fn authorization_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
    ) -> Result<String, CoreError>;

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
    -> Result<TokenGrant, CoreError>;

    /// Refreshes an access token.
    ///
    /// A rejected refresh token (`invalid_grant`) must be reported as
    /// [`CoreError::ReauthorizationRequired`].
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CoreError>;

    /// Obtains an application token with the client-credentials grant.
    async fn client_credentials(&self, scopes: &[String]) -> Result<TokenGrant, CoreError>;
}

/// Persistence for one profile's [`Credential`].
///
/// Implementations must make `save` atomic: a reader never observes a
/// partially written credential.
pub trait CredentialStore: Send + Sync {
    /// Loads the stored credential, if any.
    fn load(&self) -> Result<Option<Credential>, CoreError>;

    /// Replaces the stored credential.
    fn save(&self, credential: &Credential) -> Result<(), CoreError>;

    /// Removes the stored credential. Removing nothing is not an error.
    fn clear(&self) -> Result<(), CoreError>;

    /// Short description of where credentials live, for status output.
    fn location(&self) -> String;
}

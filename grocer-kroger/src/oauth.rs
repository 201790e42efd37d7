//! Kroger OAuth2 token endpoint.
//!
//! Clients authenticate to `/connect/oauth2/token` with HTTP Basic auth and a
//! form body. Three grants are used:
//!
//! - `authorization_code` after the user approves the consent page
//! - `refresh_token` to renew a user token
//! - `client_credentials` for catalog and location lookups that need no user
//!
//! ## Errors
//!
//! Kroger answers bad grants with `400 {"error": "invalid_grant"}`. On refresh
//! that means the stored refresh token is dead and the user has to sign in
//! again, so it maps to [`CoreError::ReauthorizationRequired`].

use async_trait::async_trait;
use grocer_core::{ClientCredentials, CoreError, TokenEndpoint, TokenGrant};
use grocer_fetch::{HttpClient, HttpError, RetryStrategy};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::api::DEFAULT_API_BASE;
use crate::error::KrogerError;

/// Default scopes for a cart-capable user token.
pub const DEFAULT_SCOPES: &[&str] = &["cart.basic:write", "product.compact", "profile.compact"];

/// Scope requested for application tokens.
pub const APP_SCOPE: &str = "product.compact";

// ============================================================================
// OAuth Error Body
// ============================================================================

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

// ============================================================================
// Token Endpoint
// ============================================================================

/// Kroger implementation of [`TokenEndpoint`].
#[derive(Debug, Clone)]
pub struct KrogerOAuth {
    http: HttpClient,
    base_url: String,
    client: ClientCredentials,
}

impl KrogerOAuth {
    /// Creates an endpoint against the production API.
    pub fn new(http: HttpClient, client: ClientCredentials) -> Self {
        Self::with_base_url(http, client, DEFAULT_API_BASE)
    }

    /// Creates an endpoint against a custom API base URL.
    ///
    /// Codes and refresh tokens are single-use, so grant requests are
    /// retried only when the connection itself failed.
    pub fn with_base_url(
        http: HttpClient,
        client: ClientCredentials,
        base_url: impl Into<String>,
    ) -> Self {
        let attempts = http.retry_strategy().max_attempts;
        Self {
            http: http.with_retry_strategy(RetryStrategy::connect_errors_only(attempts)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/connect/oauth2/token", self.base_url)
    }

    fn ensure_client(&self) -> Result<(), KrogerError> {
        if self.client.is_complete() {
            Ok(())
        } else {
            Err(KrogerError::MissingClientCredentials)
        }
    }

    /// Posts a grant form and decodes the token response.
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant, KrogerError> {
        self.ensure_client()?;

        let response = self
            .http
            .post_form_basic(
                &self.token_url(),
                form,
                &self.client.client_id,
                &self.client.client_secret,
            )
            .await
            .map_err(oauth_error)?;

        let body = response.text().await.map_err(HttpError::from)?;
        let grant: TokenGrant = serde_json::from_str(&body)?;
        debug!(expires_in = grant.expires_in, "Token grant received");
        Ok(grant)
    }
}

/// Lifts a 400/401 with an OAuth error body into [`KrogerError::OAuth`].
fn oauth_error(err: HttpError) -> KrogerError {
    if let HttpError::Status { status, body, .. } = &err {
        if matches!(status, 400 | 401) {
            if let Ok(parsed) = serde_json::from_str::<OAuthErrorBody>(body) {
                return KrogerError::OAuth {
                    status: *status,
                    error: parsed.error,
                    description: parsed.error_description.unwrap_or_default(),
                };
            }
        }
    }
    KrogerError::Http(err)
}

#[async_trait]
impl TokenEndpoint for KrogerOAuth {
    fn client(&self) -> &ClientCredentials {
        &self.client
    }

    fn authorization_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
    ) -> Result<String, CoreError> {
        self.ensure_client()?;

        let base = format!("{}/connect/oauth2/authorize", self.base_url);
        let mut url = Url::parse(&base).map_err(|_| KrogerError::InvalidBaseUrl(base.clone()))?;
        url.query_pairs_mut()
            .append_pair("scope", &scopes.join(" "))
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        Ok(url.into())
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, CoreError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        Ok(self.request_token(&form).await?)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CoreError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        match self.request_token(&form).await {
            Err(e) if e.is_oauth("invalid_grant") => {
                warn!("Refresh token rejected by Kroger");
                Err(CoreError::ReauthorizationRequired)
            }
            other => Ok(other?),
        }
    }

    #[instrument(skip(self))]
    async fn client_credentials(&self, scopes: &[String]) -> Result<TokenGrant, CoreError> {
        let scope = if scopes.is_empty() {
            APP_SCOPE.to_string()
        } else {
            scopes.join(" ")
        };
        let form = [("grant_type", "client_credentials"), ("scope", scope.as_str())];
        Ok(self.request_token(&form).await?)
    }
}

/// Default scopes as owned strings.
pub fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect()
}

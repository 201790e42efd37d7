//! OAuth2 token lifecycle.
//!
//! [`TokenManager`] owns the user's [`Credential`]. It hands out valid
//! bearer tokens, refreshes them proactively (before `expires_at - margin`)
//! or reactively (after a gateway `Unauthorized`), and runs the interactive
//! Authorization-Code flow.
//!
//! # Refresh Single-Flight
//!
//! At most one refresh runs at a time. The first caller that finds the token
//! stale installs a shared refresh future; every caller arriving while it is
//! pending awaits the same future and receives the same result. The future
//! itself writes the refreshed credential back to memory and to the
//! [`CredentialStore`] before resolving, so no waiter can observe a token
//! that has not been persisted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use grocer_core::{
    AuthorizationSession, CoreError, Credential, CredentialStore, TokenEndpoint,
};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::AuthFlowError;
use crate::host::callback::{
    CodeReceiver, DEFAULT_CALLBACK_PATH, DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT,
};

/// Random bytes in a state token.
const STATE_TOKEN_BYTES: usize = 32;

/// Consumed state tokens remembered to report reuse.
const CONSUMED_HISTORY: usize = 16;

type RefreshFuture = Shared<BoxFuture<'static, Result<Credential, CoreError>>>;

// ============================================================================
// Configuration
// ============================================================================

/// Token manager configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Tokens are treated as expired this long before `expires_at`.
    pub safety_margin: chrono::Duration,
    /// How long an authorization session stays valid.
    pub session_ttl: chrono::Duration,
    /// Default redirect URI.
    pub redirect_uri: String,
    /// Default callback port.
    pub redirect_port: u16,
    /// Default scopes for the interactive flow.
    pub scopes: Vec<String>,
    /// How long to wait for the redirect.
    pub callback_timeout: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            safety_margin: chrono::Duration::seconds(60),
            session_ttl: chrono::Duration::minutes(10),
            redirect_uri: format!("http://localhost:{DEFAULT_CALLBACK_PORT}{DEFAULT_CALLBACK_PATH}"),
            redirect_port: DEFAULT_CALLBACK_PORT,
            scopes: Vec::new(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
        }
    }
}

/// A started authorization flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// URL the user must open.
    pub url: String,
    /// State token bound to this flow.
    pub state: String,
    /// Redirect URI registered for this flow.
    pub redirect_uri: String,
}

// ============================================================================
// State
// ============================================================================

#[derive(Default)]
struct TokenState {
    credential: Option<Credential>,
    in_flight: Option<RefreshFuture>,
}

#[derive(Default)]
struct SessionState {
    pending: Option<AuthorizationSession>,
    consumed: VecDeque<String>,
}

struct AppToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

struct Inner {
    endpoint: Arc<dyn TokenEndpoint>,
    store: Arc<dyn CredentialStore>,
    config: TokenConfig,
    tokens: Mutex<TokenState>,
    sessions: Mutex<SessionState>,
    app_token: tokio::sync::Mutex<Option<AppToken>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Token Manager
// ============================================================================

/// Owns the user credential and serialises every change to it.
///
/// Cloning is cheap; clones share the same credential.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("store", &self.inner.store.location())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a manager, loading any persisted credential.
    pub fn new(
        endpoint: Arc<dyn TokenEndpoint>,
        store: Arc<dyn CredentialStore>,
        config: TokenConfig,
    ) -> Result<Self, CoreError> {
        let credential = store.load()?;
        match &credential {
            Some(c) => debug!(expires_at = %c.expires_at, store = %store.location(), "Loaded credential"),
            None => debug!(store = %store.location(), "No stored credential"),
        }

        Ok(Self {
            inner: Arc::new(Inner {
                endpoint,
                store,
                config,
                tokens: Mutex::new(TokenState {
                    credential,
                    in_flight: None,
                }),
                sessions: Mutex::new(SessionState::default()),
                app_token: tokio::sync::Mutex::new(None),
            }),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &TokenConfig {
        &self.inner.config
    }

    /// Snapshot of the current credential.
    pub fn credential(&self) -> Option<Credential> {
        lock(&self.inner.tokens).credential.clone()
    }

    /// Where the credential is persisted.
    pub fn store_location(&self) -> String {
        self.inner.store.location()
    }

    // ------------------------------------------------------------------------
    // Bearer tokens
    // ------------------------------------------------------------------------

    /// Returns a bearer token valid for at least the safety margin.
    ///
    /// Refreshes when the token is stale; concurrent callers share one refresh.
    pub async fn get_valid_token(&self) -> Result<String, CoreError> {
        let refresh = {
            let mut state = lock(&self.inner.tokens);
            let Some(credential) = &state.credential else {
                return Err(CoreError::AuthorizationRequired(
                    "no stored credential; run `grocer auth login`".to_string(),
                ));
            };
            if credential.is_valid_at(Utc::now(), self.inner.config.safety_margin) {
                return Ok(credential.access_token.clone());
            }
            self.refresh_future(&mut state)?
        };

        refresh.await.map(|c| c.access_token)
    }

    /// Refreshes after `stale_token` was rejected.
    ///
    /// If the current token already differs from `stale_token`, someone else
    /// refreshed it and it is returned as is.
    pub async fn force_refresh(&self, stale_token: &str) -> Result<String, CoreError> {
        let refresh = {
            let mut state = lock(&self.inner.tokens);
            let Some(credential) = &state.credential else {
                return Err(CoreError::AuthorizationRequired(
                    "credential was cleared".to_string(),
                ));
            };
            if credential.access_token != stale_token && state.in_flight.is_none() {
                return Ok(credential.access_token.clone());
            }
            self.refresh_future(&mut state)?
        };

        refresh.await.map(|c| c.access_token)
    }

    /// Runs `op` with a valid token, refreshing and retrying once on `Unauthorized`.
    ///
    /// A second `Unauthorized` becomes `AuthorizationRequired`.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, CoreError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let token = self.get_valid_token().await?;
        match op(token.clone()).await {
            Err(CoreError::Unauthorized) => {
                debug!("Bearer token rejected, refreshing");
                let fresh = self.force_refresh(&token).await?;
                match op(fresh).await {
                    Err(CoreError::Unauthorized) => Err(CoreError::AuthorizationRequired(
                        "token rejected again after refresh".to_string(),
                    )),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Returns the pending refresh or starts one. Caller holds the token lock.
    fn refresh_future(&self, state: &mut TokenState) -> Result<RefreshFuture, CoreError> {
        if let Some(pending) = &state.in_flight {
            debug!("Joining in-flight refresh");
            return Ok(pending.clone());
        }

        let refresh_token = match &state.credential {
            Some(c) if c.can_refresh() => c.refresh_token.clone(),
            _ => {
                return Err(CoreError::AuthorizationRequired(
                    "credential expired and has no refresh token".to_string(),
                ));
            }
        };

        let inner = Arc::clone(&self.inner);
        let refresh = run_refresh(inner, refresh_token).boxed().shared();
        state.in_flight = Some(refresh.clone());
        Ok(refresh)
    }

    // ------------------------------------------------------------------------
    // Application token
    // ------------------------------------------------------------------------

    /// Client-credentials token for calls that need no user, e.g. store lookup.
    ///
    /// Cached until it nears expiry.
    #[instrument(skip(self))]
    pub async fn application_token(&self, scopes: &[String]) -> Result<String, CoreError> {
        let mut cached = self.inner.app_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.expires_at - self.inner.config.safety_margin {
                return Ok(token.access_token.clone());
            }
        }

        let grant = self.inner.endpoint.client_credentials(scopes).await?;
        let token = AppToken {
            access_token: grant.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(grant.expires_in),
        };
        *cached = Some(token);
        Ok(grant.access_token)
    }

    // ------------------------------------------------------------------------
    // Authorization-Code flow
    // ------------------------------------------------------------------------

    /// Starts a flow using the configured redirect URI.
    pub fn start_authorization_flow(
        &self,
        scopes: &[String],
    ) -> Result<AuthorizationRequest, CoreError> {
        let config = &self.inner.config;
        self.start_authorization_flow_at(scopes, &config.redirect_uri, config.redirect_port)
    }

    /// Starts a flow for a specific redirect URI, replacing any pending session.
    pub fn start_authorization_flow_at(
        &self,
        scopes: &[String],
        redirect_uri: &str,
        port: u16,
    ) -> Result<AuthorizationRequest, CoreError> {
        let scopes: Vec<String> = if scopes.is_empty() {
            self.inner.config.scopes.clone()
        } else {
            scopes.to_vec()
        };
        if scopes.is_empty() {
            return Err(CoreError::InvalidConfig(
                "no OAuth scopes configured".to_string(),
            ));
        }

        let state_token = generate_state_token()?;
        let url = self
            .inner
            .endpoint
            .authorization_url(redirect_uri, &scopes, &state_token)?;

        let now = Utc::now();
        let session = AuthorizationSession {
            state_token: state_token.clone(),
            redirect_uri: redirect_uri.to_string(),
            expected_port: port,
            scopes,
            created_at: now,
            expires_at: now + self.inner.config.session_ttl,
        };

        let mut sessions = lock(&self.inner.sessions);
        if sessions.pending.is_some() {
            debug!("Replacing pending authorization session");
        }
        sessions.pending = Some(session);

        Ok(AuthorizationRequest {
            url,
            state: state_token,
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// Validates `state` against the pending session and exchanges `code`.
    ///
    /// A mismatching state leaves the session pending.
    #[instrument(skip(self, code, state))]
    pub async fn complete_authorization_flow(
        &self,
        code: &str,
        state: &str,
    ) -> Result<Credential, AuthFlowError> {
        let session = self.consume_session(code, state)?;

        let endpoint = &self.inner.endpoint;
        let grant = endpoint.exchange_code(code, &session.redirect_uri).await?;
        let credential =
            Credential::from_grant(endpoint.client(), grant, &session.scopes, Utc::now());

        self.inner.store.save(&credential)?;

        let mut tokens = lock(&self.inner.tokens);
        tokens.credential = Some(credential.clone());
        info!(expires_at = %credential.expires_at, "Authorization complete");
        Ok(credential)
    }

    fn consume_session(&self, code: &str, state: &str) -> Result<AuthorizationSession, AuthFlowError> {
        let mut sessions = lock(&self.inner.sessions);

        let Some(pending) = &sessions.pending else {
            if sessions.consumed.iter().any(|s| s == state) {
                return Err(AuthFlowError::SessionConsumed);
            }
            return Err(AuthFlowError::NoPendingSession);
        };

        if pending.state_token != state {
            if sessions.consumed.iter().any(|s| s == state) {
                return Err(AuthFlowError::SessionConsumed);
            }
            warn!("Authorization callback state does not match pending session");
            return Err(AuthFlowError::StateMismatch);
        }

        if pending.is_expired_at(Utc::now()) {
            sessions.pending = None;
            return Err(AuthFlowError::SessionExpired);
        }

        if code.trim().is_empty() {
            return Err(AuthFlowError::MissingCode);
        }

        let session = sessions.pending.take().ok_or(AuthFlowError::NoPendingSession)?;
        if sessions.consumed.len() >= CONSUMED_HISTORY {
            sessions.consumed.pop_front();
        }
        sessions.consumed.push_back(session.state_token.clone());
        Ok(session)
    }

    /// Runs the whole interactive flow through `receiver`.
    ///
    /// `on_url` is called with the authorization URL once the session exists.
    pub async fn authorize<F>(
        &self,
        receiver: Box<dyn CodeReceiver>,
        scopes: &[String],
        on_url: F,
    ) -> Result<Credential, AuthFlowError>
    where
        F: FnOnce(&AuthorizationRequest) + Send,
    {
        let request =
            self.start_authorization_flow_at(scopes, &receiver.redirect_uri(), receiver.port())?;
        on_url(&request);

        let params = receiver.receive(self.inner.config.callback_timeout).await?;

        if let Some(error) = params.error {
            lock(&self.inner.sessions).pending = None;
            let description = params.error_description.unwrap_or(error);
            return Err(AuthFlowError::AccessDenied(description));
        }

        let code = params.code.ok_or(AuthFlowError::MissingCode)?;
        let state = params.state.ok_or(AuthFlowError::StateMismatch)?;
        self.complete_authorization_flow(&code, &state).await
    }

    /// Forgets the credential in memory and in the store.
    pub fn logout(&self) -> Result<(), CoreError> {
        {
            let mut tokens = lock(&self.inner.tokens);
            tokens.credential = None;
            tokens.in_flight = None;
        }
        self.inner.store.clear()?;
        info!("Credential cleared");
        Ok(())
    }
}

/// Performs one refresh and writes the result back before resolving.
async fn run_refresh(inner: Arc<Inner>, refresh_token: String) -> Result<Credential, CoreError> {
    debug!("Refreshing access token");
    let result = inner.endpoint.refresh(&refresh_token).await;

    let mut state = lock(&inner.tokens);
    state.in_flight = None;

    match result {
        Ok(grant) => {
            let Some(current) = state.credential.as_mut() else {
                return Err(CoreError::AuthorizationRequired(
                    "credential was cleared during refresh".to_string(),
                ));
            };
            if current.refresh_token != refresh_token {
                // Replaced by a new login while the refresh was in flight.
                return Ok(current.clone());
            }

            current.apply_refresh(grant, Utc::now());
            let refreshed = current.clone();
            if let Err(e) = inner.store.save(&refreshed) {
                warn!(error = %e, "Refreshed credential could not be persisted");
            }
            info!(expires_at = %refreshed.expires_at, "Access token refreshed");
            Ok(refreshed)
        }
        Err(CoreError::ReauthorizationRequired) => {
            warn!("Refresh token rejected; clearing credential");
            state.credential = None;
            if let Err(e) = inner.store.clear() {
                warn!(error = %e, "Failed to clear stored credential");
            }
            Err(CoreError::ReauthorizationRequired)
        }
        Err(e) => {
            warn!(error = %e, "Token refresh failed");
            Err(e)
        }
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_state_token() -> Result<String, CoreError> {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| CoreError::InvalidConfig("system random source unavailable".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

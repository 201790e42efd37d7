//! OAuth credential types.
//!
//! # Persisted Format
//!
//! ```json
//! {
//!   "client_id": "grocer-abc123",
//!   "client_secret": "...",
//!   "access_token": "eyJ...",
//!   "refresh_token": "...",
//!   "expires_at": "2026-01-01T12:30:00Z",
//!   "scopes": ["cart.basic:write", "product.compact"]
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Token lifetime assumed when the endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 1800;

// ============================================================================
// Client Credentials
// ============================================================================

/// Application credentials registered with the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

impl ClientCredentials {
    /// Creates client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Returns true if both values are present.
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Token Grant
// ============================================================================

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Raw token endpoint response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Bearer token.
    pub access_token: String,
    /// Refresh token; providers may omit it on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    /// Space separated scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Token type, normally "Bearer".
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl TokenGrant {
    /// Scopes granted, split on whitespace.
    pub fn scope_set(&self) -> Option<BTreeSet<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

// ============================================================================
// Credential
// ============================================================================

/// User credential produced by the Authorization-Code exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Current bearer token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Absolute expiry of the access token.
    pub expires_at: DateTime<Utc>,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

impl Credential {
    /// Builds a credential from a code-exchange grant.
    ///
    /// `requested` scopes are recorded when the grant does not echo them.
    pub fn from_grant(
        client: &ClientCredentials,
        grant: TokenGrant,
        requested: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = grant
            .scope_set()
            .unwrap_or_else(|| requested.iter().cloned().collect());
        Self {
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or_default(),
            expires_at: now + Duration::seconds(grant.expires_in),
            scopes,
        }
    }

    /// Applies a refresh grant in place.
    ///
    /// The previous refresh token and scopes are kept when the grant omits them.
    pub fn apply_refresh(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        if let Some(scopes) = grant.scope_set() {
            self.scopes = scopes;
        }
        if let Some(refresh) = grant.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = refresh;
        }
        self.access_token = grant.access_token;
        self.expires_at = now + Duration::seconds(grant.expires_in);
    }

    /// Returns true while `now < expires_at - margin`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now < self.expires_at - margin
    }

    /// Returns true if a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Check if the credential has a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Client credentials embedded in this credential.
    pub fn client(&self) -> ClientCredentials {
        ClientCredentials::new(&self.client_id, &self.client_secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

// ============================================================================
// Authorization Session
// ============================================================================

/// A pending interactive authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationSession {
    /// Random single-use state token.
    pub state_token: String,
    /// Redirect URI sent to the authorization endpoint.
    pub redirect_uri: String,
    /// Port the local listener is expected on.
    pub expected_port: u16,
    /// Scopes requested.
    pub scopes: Vec<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationSession {
    /// Returns true once the session TTL has passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// ============================================================================
// Tests
// ============================================================================

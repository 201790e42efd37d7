//! In-memory fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use grocer_core::{
    CandidateProduct, CatalogGateway, ClientCredentials, CoreError, Credential, CredentialStore,
    StoreLocation, TokenEndpoint, TokenGrant,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Token endpoint
// ============================================================================

/// How the fake endpoint answers refresh requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Succeed,
    InvalidGrant,
    Unavailable,
}

pub struct FakeEndpoint {
    client: ClientCredentials,
    pub mode: Mutex<RefreshMode>,
    pub refresh_delay: std::time::Duration,
    pub refresh_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub app_calls: AtomicUsize,
    pub omit_refresh_token: bool,
}

impl FakeEndpoint {
    pub fn new() -> Self {
        Self {
            client: ClientCredentials::new("client-id", "client-secret"),
            mode: Mutex::new(RefreshMode::Succeed),
            refresh_delay: std::time::Duration::ZERO,
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            app_calls: AtomicUsize::new(0),
            omit_refresh_token: false,
        }
    }

    pub fn with_mode(self, mode: RefreshMode) -> Self {
        *self.mode.lock().unwrap() = mode;
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

fn grant(access: String, refresh: Option<String>) -> TokenGrant {
    TokenGrant {
        access_token: access,
        refresh_token: refresh,
        expires_in: 1800,
        scope: None,
        token_type: "Bearer".to_string(),
    }
}

#[async_trait]
impl TokenEndpoint for FakeEndpoint {
    fn client(&self) -> &ClientCredentials {
        &self.client
    }

    fn authorization_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
    ) -> Result<String, CoreError> {
        Ok(format!(
            "https://auth.example/authorize?redirect_uri={redirect_uri}&scope={}&state={state}",
            scopes.join("+")
        ))
    }

    async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<TokenGrant, CoreError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        Ok(grant(format!("access-{code}"), Some("refresh-1".to_string())))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CoreError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        let mode = *self.mode.lock().unwrap();
        match mode {
            RefreshMode::Succeed => {
                let refresh = if self.omit_refresh_token {
                    None
                } else {
                    Some(format!("{refresh_token}-r{n}"))
                };
                Ok(grant(format!("access-refreshed-{n}"), refresh))
            }
            RefreshMode::InvalidGrant => Err(CoreError::ReauthorizationRequired),
            RefreshMode::Unavailable => Err(CoreError::RemoteUnavailable("HTTP 503".to_string())),
        }
    }

    async fn client_credentials(&self, _scopes: &[String]) -> Result<TokenGrant, CoreError> {
        let n = self.app_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(grant(format!("app-{n}"), None))
    }
}

// ============================================================================
// Credential store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    pub credential: Mutex<Option<Credential>>,
    pub saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn stored(&self) -> Option<Credential> {
        self.credential.lock().unwrap().clone()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        Ok(self.stored())
    }

    fn save(&self, credential: &Credential) -> Result<(), CoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.credential.lock().unwrap() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.credential.lock().unwrap() = None;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// A credential expiring `secs` seconds from now (negative for expired).
pub fn credential(access: &str, secs: i64) -> Credential {
    Credential {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        access_token: access.to_string(),
        refresh_token: "refresh-0".to_string(),
        expires_at: Utc::now() + Duration::seconds(secs),
        scopes: BTreeSet::from(["cart.basic:write".to_string()]),
    }
}

// ============================================================================
// Catalog gateway
// ============================================================================

#[derive(Default)]
pub struct FakeGateway {
    pub catalog: HashMap<String, Vec<CandidateProduct>>,
    /// Product ids whose next add is rejected with `Unauthorized`.
    pub reject_add_once: Mutex<HashSet<String>>,
    /// Terms whose search is always rejected with `Unauthorized`.
    pub reject_search: HashSet<String>,
    /// Terms whose search fails with the given error.
    pub fail_search: HashMap<String, CoreError>,
    /// Per-term search delay.
    pub search_delay: HashMap<String, std::time::Duration>,
    /// (product id, quantity, token) for every successful add.
    pub adds: Mutex<Vec<(String, u32, String)>>,
    pub search_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn with_product(mut self, term: &str, product: CandidateProduct) -> Self {
        self.catalog.entry(term.to_string()).or_default().push(product);
        self
    }

    pub fn added(&self) -> Vec<(String, u32, String)> {
        self.adds.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogGateway for FakeGateway {
    async fn search_products(
        &self,
        term: &str,
        _store_id: &str,
        _token: &str,
    ) -> Result<Vec<CandidateProduct>, CoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.search_delay.get(term) {
            tokio::time::sleep(*delay).await;
        }
        if self.reject_search.contains(term) {
            return Err(CoreError::Unauthorized);
        }
        if let Some(err) = self.fail_search.get(term) {
            return Err(err.clone());
        }
        Ok(self.catalog.get(term).cloned().unwrap_or_default())
    }

    async fn add_to_cart(&self, product_id: &str, quantity: u32, token: &str) -> Result<(), CoreError> {
        if self.reject_add_once.lock().unwrap().remove(product_id) {
            return Err(CoreError::Unauthorized);
        }
        self.adds
            .lock()
            .unwrap()
            .push((product_id.to_string(), quantity, token.to_string()));
        Ok(())
    }

    async fn list_stores(&self, _zip_code: &str, _token: &str) -> Result<Vec<StoreLocation>, CoreError> {
        Ok(Vec::new())
    }
}

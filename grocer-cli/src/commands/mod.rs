//! CLI command implementations.

pub mod add;
pub mod auth;
pub mod config;
pub mod search;
pub mod stores;

use std::sync::Arc;

use anyhow::{Context, Result};
use grocer_core::{ClientCredentials, CredentialStore, StoreContext};
use grocer_fetch::{CartOrchestrator, HttpClient, TokenManager};
use grocer_kroger::{KrogerGateway, KrogerOAuth};
use grocer_store::{Settings, open_credential_store};
use tracing::debug;

/// Services wired from settings, shared by the commands that talk to the API.
pub struct App {
    /// Effective settings (file plus environment).
    pub settings: Settings,
    /// Token lifecycle for the active profile.
    pub tokens: TokenManager,
    /// Catalog and cart adapter.
    pub gateway: Arc<KrogerGateway>,
}

impl App {
    /// Loads settings from the default location and wires services.
    pub async fn load() -> Result<Self> {
        Self::from_settings(Settings::load_default().await)
    }

    /// Wires services from `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate().context("invalid settings")?;

        let http = HttpClient::new()?.with_retry_strategy(settings.retry_strategy());
        let store: Arc<dyn CredentialStore> = Arc::from(open_credential_store(
            settings.credential_backend,
            &settings.profile,
        )?);
        let client = resolve_client(&settings, store.as_ref())?;

        let endpoint = Arc::new(KrogerOAuth::with_base_url(
            http.clone(),
            client,
            &settings.api_base_url,
        ));
        let tokens = TokenManager::new(endpoint, store, settings.token_config())?;
        let gateway = Arc::new(
            KrogerGateway::with_base_url(http, &settings.api_base_url).with_chain(&settings.chain),
        );

        debug!(profile = %settings.profile, store = %tokens.store_location(), "App ready");
        Ok(Self {
            settings,
            tokens,
            gateway,
        })
    }

    /// Batch orchestrator over this app's gateway and tokens.
    pub fn orchestrator(&self) -> CartOrchestrator {
        CartOrchestrator::new(
            self.gateway.clone(),
            self.tokens.clone(),
            self.settings.orchestrator_config(),
        )
    }

    /// The selected store, or an error telling the user how to pick one.
    pub fn store_context(&self) -> Result<StoreContext> {
        self.settings.store_context().cloned().context(
            "No store selected. Run `grocer stores --zip <ZIP> --select <N>` or set KROGER_STORE_ID",
        )
    }
}

/// Client credentials from settings, else from the stored credential.
fn resolve_client(settings: &Settings, store: &dyn CredentialStore) -> Result<ClientCredentials> {
    let configured = settings.client_credentials();
    if configured.is_complete() {
        return Ok(configured);
    }
    if let Some(stored) = store.load()?.map(|c| c.client()) {
        if stored.is_complete() {
            debug!("Using client credentials from the stored credential");
            return Ok(stored);
        }
    }
    Ok(configured)
}

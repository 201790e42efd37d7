//! User settings.
//!
//! Settings live in `<config_dir>/grocer/settings.json`. Every field has a
//! default, so a missing or partial file is fine. A handful of environment
//! variables override the file:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `KROGER_CLIENT_ID` | `client_id` |
//! | `KROGER_CLIENT_SECRET` | `client_secret` |
//! | `KROGER_STORE_ID` | `store.store_id` |
//! | `KROGER_ZIP_CODE` | `store.zip_code` |

use grocer_core::{ClientCredentials, MatchPolicy, StoreContext};
use grocer_fetch::{
    DEFAULT_CALLBACK_PATH, DEFAULT_CALLBACK_PORT, OrchestratorConfig, RetryStrategy, TokenConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json_or_default, save_json};

/// Environment variable for the OAuth client id.
pub const ENV_CLIENT_ID: &str = "KROGER_CLIENT_ID";
/// Environment variable for the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "KROGER_CLIENT_SECRET";
/// Environment variable for the store location id.
pub const ENV_STORE_ID: &str = "KROGER_STORE_ID";
/// Environment variable for the store ZIP code.
pub const ENV_ZIP_CODE: &str = "KROGER_ZIP_CODE";

const DEFAULT_API_BASE: &str = "https://api.kroger.com/v1";
const DEFAULT_CHAIN: &str = "FRED MEYER";
const DEFAULT_SCOPES: &[&str] = &["cart.basic:write", "product.compact", "profile.compact"];

// ============================================================================
// Settings Types
// ============================================================================

/// Where the OAuth credential is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// JSON file under the config directory.
    #[default]
    File,
    /// System keychain.
    Keychain,
}

impl fmt::Display for CredentialBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Keychain => f.write_str("keychain"),
        }
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Local profile name; one credential per profile.
    pub profile: String,

    /// Credential storage backend.
    pub credential_backend: CredentialBackend,

    /// OAuth client id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// API base URL.
    pub api_base_url: String,

    /// Chain filter for store lookups.
    pub chain: String,

    /// Local port for the OAuth redirect listener.
    pub redirect_port: u16,

    /// Path the redirect listener answers on.
    pub redirect_path: String,

    /// Seconds to wait for the OAuth redirect.
    pub callback_timeout_secs: u64,

    /// Scopes requested at sign-in.
    pub scopes: Vec<String>,

    /// Tokens count as expired this many seconds early.
    pub token_safety_margin_secs: i64,

    /// Store all searches run against.
    pub store: Option<StoreContext>,

    /// Attempts per HTTP request, including the first.
    pub retry_attempts: u32,

    /// Batch items processed at once.
    pub batch_concurrency: usize,

    /// Minimum spacing between API calls in a batch.
    pub min_call_interval_ms: u64,

    /// Match engine weights and thresholds.
    pub match_policy: MatchPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            credential_backend: CredentialBackend::File,
            client_id: None,
            client_secret: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
            chain: DEFAULT_CHAIN.to_string(),
            redirect_port: DEFAULT_CALLBACK_PORT,
            redirect_path: DEFAULT_CALLBACK_PATH.to_string(),
            callback_timeout_secs: 300,
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            token_safety_margin_secs: 60,
            store: None,
            retry_attempts: 3,
            batch_concurrency: 4,
            min_call_interval_ms: 250,
            match_policy: MatchPolicy::default(),
        }
    }
}

// ============================================================================
// Loading and Saving
// ============================================================================

impl Settings {
    /// Loads settings from `path`, falling back to defaults.
    pub async fn load(path: &Path) -> Self {
        let settings: Self = load_json_or_default(path).await;
        debug!(path = %path.display(), profile = %settings.profile, "Settings loaded");
        settings
    }

    /// Loads settings from the default path and applies environment overrides.
    pub async fn load_default() -> Self {
        let mut settings = Self::load(&default_settings_path()).await;
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    /// Saves settings to `path`.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await?;
        info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Applies environment overrides using `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = get(ENV_CLIENT_ID) {
            self.client_id = Some(id);
        }
        if let Some(secret) = get(ENV_CLIENT_SECRET) {
            self.client_secret = Some(secret);
        }

        let store_id = get(ENV_STORE_ID);
        let zip_code = get(ENV_ZIP_CODE);
        if store_id.is_some() || zip_code.is_some() {
            let mut store = self
                .store
                .take()
                .unwrap_or_else(|| StoreContext::new("", ""));
            if let Some(id) = store_id {
                store.store_id = id;
            }
            if let Some(zip) = zip_code {
                store.zip_code = zip;
            }
            self.store = Some(store);
        }
    }

    /// Checks that values are usable.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.profile.trim().is_empty() {
            return Err(StoreError::Config("profile must not be empty".to_string()));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(StoreError::Config(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if !self.redirect_path.starts_with('/') {
            return Err(StoreError::Config("redirect_path must start with '/'".to_string()));
        }
        if self.scopes.is_empty() {
            return Err(StoreError::Config("at least one scope is required".to_string()));
        }
        if self.token_safety_margin_secs < 0 {
            return Err(StoreError::Config(
                "token_safety_margin_secs must not be negative".to_string(),
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(StoreError::Config("batch_concurrency must be at least 1".to_string()));
        }
        self.match_policy
            .validate()
            .map_err(|e| StoreError::Config(e.to_string()))
    }
}

// ============================================================================
// Derived Configuration
// ============================================================================

impl Settings {
    /// Client credentials from settings and environment.
    pub fn client_credentials(&self) -> ClientCredentials {
        ClientCredentials::new(
            self.client_id.clone().unwrap_or_default(),
            self.client_secret.clone().unwrap_or_default(),
        )
    }

    /// Store context, if one is fully configured.
    pub fn store_context(&self) -> Option<&StoreContext> {
        self.store.as_ref().filter(|s| !s.store_id.is_empty())
    }

    /// Redirect URI registered with the provider.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.redirect_port, self.redirect_path)
    }

    /// Token manager configuration.
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            safety_margin: chrono::Duration::seconds(self.token_safety_margin_secs),
            redirect_uri: self.redirect_uri(),
            redirect_port: self.redirect_port,
            scopes: self.scopes.clone(),
            callback_timeout: Duration::from_secs(self.callback_timeout_secs),
            ..TokenConfig::default()
        }
    }

    /// HTTP retry strategy.
    pub fn retry_strategy(&self) -> RetryStrategy {
        RetryStrategy::new(self.retry_attempts)
    }

    /// Batch orchestrator configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            concurrency: self.batch_concurrency,
            min_call_interval: Duration::from_millis(self.min_call_interval_ms),
            policy: self.match_policy.clone(),
        }
    }
}

// ============================================================================
// Key Access
// ============================================================================

impl Settings {
    /// Returns the value at a dotted key such as `match_policy.min_margin`.
    pub fn get_value(&self, key: &str) -> Result<Value, StoreError> {
        let root = serde_json::to_value(self)?;
        key.split('.')
            .try_fold(&root, |value, part| value.get(part))
            .cloned()
            .ok_or_else(|| StoreError::UnknownSetting(key.to_string()))
    }

    /// Sets the value at a dotted key from its text form.
    ///
    /// `raw` is read as JSON when it parses (numbers, booleans, arrays),
    /// otherwise as a string. A plain string assigned to a list is split on
    /// whitespace, so `scopes` can be set to `"cart.basic:write product.compact"`.
    /// Settings are left untouched on error.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<(), StoreError> {
        let root = serde_json::to_value(&*self)?;
        let current = key
            .split('.')
            .try_fold(&root, |value, part| value.get(part));

        let mut last_error = None;
        for candidate in candidate_values(raw, current) {
            let mut doc = root.clone();
            insert_at(&mut doc, key, candidate.clone())?;

            match serde_json::from_value::<Settings>(doc) {
                Ok(updated) => {
                    // Keys serde does not know are dropped on the way back in.
                    if updated.get_value(key).ok().as_ref() != Some(&candidate) {
                        return Err(StoreError::UnknownSetting(key.to_string()));
                    }
                    updated.validate()?;
                    *self = updated;
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(StoreError::Config(match last_error {
            Some(e) => format!("{key}: {e}"),
            None => format!("{key}: no value"),
        }))
    }
}

/// Values to try for `raw`, most specific first.
fn candidate_values(raw: &str, current: Option<&Value>) -> Vec<Value> {
    let literal = Value::String(raw.to_string());
    match (serde_json::from_str::<Value>(raw).ok(), current) {
        (Some(array @ Value::Array(_)), _) => vec![array],
        (_, Some(Value::Array(_))) => vec![Value::Array(
            raw.split_whitespace()
                .map(|word| Value::String(word.to_string()))
                .collect(),
        )],
        (Some(text @ Value::String(_)), _) => vec![text],
        (Some(value), _) => vec![value, literal],
        (None, _) => vec![literal],
    }
}

/// Writes `value` at a dotted key, creating objects for null parents.
fn insert_at(root: &mut Value, key: &str, value: Value) -> Result<(), StoreError> {
    let unknown = || StoreError::UnknownSetting(key.to_string());
    let parts: Vec<&str> = key.split('.').collect();
    let (last, parents) = parts.split_last().ok_or_else(unknown)?;

    let mut slot = root;
    for part in parents {
        let Value::Object(map) = slot else {
            return Err(unknown());
        };
        let child = map.entry((*part).to_string()).or_insert(Value::Null);
        if child.is_null() {
            *child = Value::Object(serde_json::Map::new());
        }
        slot = child;
    }

    let Value::Object(map) = slot else {
        return Err(unknown());
    };
    map.insert((*last).to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.redirect_uri(), "http://localhost:8888/callback");
        assert_eq!(settings.scopes.len(), 3);
        assert!(settings.store_context().is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"profile": "work", "redirect_port": 9000}"#).unwrap();
        assert_eq!(settings.profile, "work");
        assert_eq!(settings.redirect_port, 9000);
        assert_eq!(settings.chain, "FRED MEYER");
        assert_eq!(settings.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_CLIENT_ID, "grocer-app"),
            (ENV_CLIENT_SECRET, "s3cret"),
            (ENV_STORE_ID, "70100123"),
            (ENV_ZIP_CODE, ""),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| (*v).to_string()));

        assert!(settings.client_credentials().is_complete());
        let store = settings.store_context().unwrap();
        assert_eq!(store.store_id, "70100123");
        assert_eq!(store.zip_code, "");
    }

    #[test]
    fn test_env_zip_keeps_store_id() {
        let mut settings = Settings {
            store: Some(StoreContext::new("701", "97201")),
            ..Settings::default()
        };
        settings.apply_env(|k| (k == ENV_ZIP_CODE).then(|| "97214".to_string()));
        assert_eq!(settings.store, Some(StoreContext::new("701", "97214")));
    }

    #[test]
    fn test_derived_configs() {
        let settings = Settings {
            token_safety_margin_secs: 120,
            batch_concurrency: 2,
            min_call_interval_ms: 0,
            retry_attempts: 5,
            ..Settings::default()
        };
        assert_eq!(settings.token_config().safety_margin, chrono::Duration::seconds(120));
        assert_eq!(settings.orchestrator_config().concurrency, 2);
        assert!(settings.orchestrator_config().min_call_interval.is_zero());
        assert_eq!(settings.retry_strategy().max_attempts, 5);
    }

    #[test]
    fn test_set_value() {
        let mut settings = Settings::default();
        settings.set_value("redirect_port", "9123").unwrap();
        settings.set_value("chain", "KROGER").unwrap();
        settings.set_value("credential_backend", "keychain").unwrap();
        settings.set_value("match_policy.min_margin", "0.2").unwrap();
        settings.set_value("scopes", "product.compact cart.basic:write").unwrap();
        settings.set_value("store.store_id", "70100123").unwrap();

        assert_eq!(settings.redirect_port, 9123);
        assert_eq!(settings.chain, "KROGER");
        assert_eq!(settings.credential_backend, CredentialBackend::Keychain);
        assert!((settings.match_policy.min_margin - 0.2).abs() < f64::EPSILON);
        assert_eq!(settings.scopes, vec!["product.compact", "cart.basic:write"]);
        assert_eq!(settings.store_context().unwrap().store_id, "70100123");
        assert_eq!(
            settings.get_value("store.store_id").unwrap(),
            Value::String("70100123".to_string())
        );
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set_value("no_such_key", "1"),
            Err(StoreError::UnknownSetting(_))
        ));
        assert!(matches!(
            settings.set_value("match_policy.bogus", "1"),
            Err(StoreError::UnknownSetting(_))
        ));
        assert!(matches!(
            settings.set_value("redirect_port", "not-a-port"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            settings.set_value("match_policy.confidence_threshold", "2.0"),
            Err(StoreError::Config(_))
        ));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_numeric_string_kept_as_string() {
        let mut settings = Settings::default();
        settings.set_value("profile", "2024").unwrap();
        assert_eq!(settings.profile, "2024");
    }
}

//! Credential storage backends.
//!
//! One OAuth [`Credential`] is kept per local profile:
//!
//! 1. **File** - `<config_dir>/grocer/credentials/<profile>.json`, mode 0600
//! 2. **Keychain** - service `grocer`, account = profile
//! 3. **Memory** - process lifetime only
//!
//! Reads and writes are whole-record; a reader never sees a partial write.

use grocer_core::{CoreError, Credential, CredentialStore};
use keyring::Entry;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::persistence::{default_credentials_dir, load_json_blocking, remove_if_exists, save_json_blocking};
use crate::settings::CredentialBackend;

/// Keychain service name.
pub const KEYCHAIN_SERVICE: &str = "grocer";

/// Checks that a profile name is safe to use as a file name.
pub fn validate_profile(profile: &str) -> Result<(), StoreError> {
    let valid = !profile.is_empty()
        && profile.len() <= 64
        && profile
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidProfile(profile.to_string()))
    }
}

// ============================================================================
// File Backend
// ============================================================================

/// Stores the credential as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the store for `profile` under `dir`.
    pub fn in_dir(dir: &Path, profile: &str) -> Result<Self, StoreError> {
        validate_profile(profile)?;
        Ok(Self::new(dir.join(format!("{profile}.json"))))
    }

    /// Creates the store for `profile` in the default credentials directory.
    pub fn for_profile(profile: &str) -> Result<Self, StoreError> {
        Self::in_dir(&default_credentials_dir(), profile)
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        match load_json_blocking::<Credential>(&self.path) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) if e.is_not_found() => {
                debug!("No stored credential");
                Ok(None)
            }
            Err(StoreError::Serialization(e)) => Err(CoreError::Storage(format!(
                "credential file {} is corrupt: {e}",
                self.path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), CoreError> {
        save_json_blocking(&self.path, credential)?;
        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        remove_if_exists(&self.path)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// Keychain Backend
// ============================================================================

/// Stores the credential JSON in the system keychain.
#[derive(Debug, Clone)]
pub struct KeychainCredentialStore {
    service: String,
    account: String,
}

impl KeychainCredentialStore {
    /// Creates the store for `profile`.
    pub fn for_profile(profile: &str) -> Result<Self, StoreError> {
        validate_profile(profile)?;
        Ok(Self {
            service: KEYCHAIN_SERVICE.to_string(),
            account: profile.to_string(),
        })
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl CredentialStore for KeychainCredentialStore {
    #[instrument(skip(self), fields(account = %self.account))]
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        match self.entry()?.get_password() {
            Ok(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                CoreError::Storage(format!("keychain credential is corrupt: {e}"))
            }),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), CoreError> {
        let json = serde_json::to_string(credential).map_err(StoreError::from)?;
        self.entry()?
            .set_password(&json)
            .map_err(StoreError::from)?;
        debug!(account = %self.account, "Credential saved to keychain");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Failed to delete keychain credential");
                Err(StoreError::from(e).into())
            }
        }
    }

    fn location(&self) -> String {
        format!("keychain:{}/{}", self.service, self.account)
    }
}

// ============================================================================
// Memory Backend
// ============================================================================

/// Keeps the credential in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `credential`.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.credential.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        Ok(self.slot().clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), CoreError> {
        *self.slot() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.slot() = None;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Opens the configured backend for `profile`.
pub fn open_credential_store(
    backend: CredentialBackend,
    profile: &str,
) -> Result<Box<dyn CredentialStore>, StoreError> {
    Ok(match backend {
        CredentialBackend::File => Box::new(FileCredentialStore::for_profile(profile)?),
        CredentialBackend::Keychain => Box::new(KeychainCredentialStore::for_profile(profile)?),
    })
}

//! Store error types.

use grocer_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown settings key.
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// Profile name unusable as a file or keychain account name.
    #[error("Invalid profile name: {0:?}")]
    InvalidProfile(String),

    /// Keychain access failed.
    #[error("Keychain error: {0}")]
    Keychain(String),
}

impl StoreError {
    /// Returns true if the error means the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        StoreError::Keychain(err.to_string())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Config(_) | StoreError::UnknownSetting(_) | StoreError::InvalidProfile(_) => {
                CoreError::InvalidConfig(err.to_string())
            }
            other => CoreError::Storage(other.to_string()),
        }
    }
}

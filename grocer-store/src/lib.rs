// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Grocer Store
//!
//! Local state for Grocer.
//!
//! This crate provides:
//!
//! - **Settings**: User preferences with environment overrides
//! - **Credential stores**: File, keychain, and in-memory [`CredentialStore`]
//!   backends
//! - **Persistence**: Atomic, owner-only JSON file I/O
//!
//! ## Usage
//!
//! ```ignore
//! use grocer_store::{Settings, open_credential_store};
//!
//! let settings = Settings::load_default().await;
//! let store = open_credential_store(settings.credential_backend, &settings.profile)?;
//! let credential = store.load()?;
//! ```
//!
//! [`CredentialStore`]: grocer_core::CredentialStore

pub mod credential_store;
pub mod error;
pub mod persistence;
pub mod settings;

pub use credential_store::{
    FileCredentialStore, KEYCHAIN_SERVICE, KeychainCredentialStore, MemoryCredentialStore,
    open_credential_store, validate_profile,
};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_credentials_dir, default_settings_path, load_json,
    load_json_or_default, save_json,
};
pub use settings::{
    CredentialBackend, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_STORE_ID, ENV_ZIP_CODE, Settings,
};

#[cfg(test)]
mod persistence_tests;

//! Persistence round-trip and edge case tests.
//!
//! Tests file I/O operations, credential files, and settings round-trip.

use chrono::{Duration, TimeZone, Utc};
use grocer_core::{Credential, CredentialStore, CoreError, StoreContext};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::credential_store::FileCredentialStore;
use crate::persistence::{load_json, load_json_or_default, save_json, write_atomic};
use crate::settings::{CredentialBackend, Settings};

fn credential() -> Credential {
    Credential {
        client_id: "grocer-app".to_string(),
        client_secret: "s3cret".to_string(),
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap(),
        scopes: BTreeSet::from(["cart.basic:write".to_string(), "product.compact".to_string()]),
    }
}

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_settings_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let settings = Settings {
        profile: "work".to_string(),
        credential_backend: CredentialBackend::Keychain,
        store: Some(StoreContext::new("70100123", "97201")),
        ..Settings::default()
    };

    settings.save(&file_path).await.unwrap();
    let loaded = Settings::load(&file_path).await;

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("test.json");

    let data = serde_json::json!({"key": "value"});
    save_json(&nested_path, &data).await.unwrap();
    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/settings.json");

    let result: Result<Settings, _> = load_json(&file_path).await;
    assert!(result.unwrap_err().is_not_found());

    let settings: Settings = load_json_or_default(&file_path).await;
    assert_eq!(settings, Settings::default());
}

#[tokio::test]
async fn test_corrupt_settings_fall_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");
    std::fs::write(&file_path, "{ not json").unwrap();

    let settings = Settings::load(&file_path).await;
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_atomic_write_replaces_and_cleans_up() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.json");

    write_atomic(&path, b"first").unwrap();
    write_atomic(&path, b"second").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

// ============================================================================
// Credential File Tests
// ============================================================================

#[test]
fn test_credential_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCredentialStore::in_dir(temp_dir.path(), "default").unwrap();

    assert!(store.load().unwrap().is_none());

    store.save(&credential()).unwrap();
    assert_eq!(store.load().unwrap(), Some(credential()));

    let json = std::fs::read_to_string(store.path()).unwrap();
    assert!(json.contains("\"expires_at\": \"2026-01-01T12:30:00Z\""));

    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
    store.clear().unwrap();
}

#[cfg(unix)]
#[test]
fn test_credential_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("grocer").join("credentials");
    let store = FileCredentialStore::in_dir(&dir, "default").unwrap();
    store.save(&credential()).unwrap();

    let file_mode = std::fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
    assert_eq!(file_mode, 0o600, "Credential file should have 0600 permissions");

    let dir_mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
    assert_eq!(dir_mode, 0o700, "Credential directory should have 0700 permissions");
}

#[test]
fn test_refresh_overwrites_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCredentialStore::in_dir(temp_dir.path(), "default").unwrap();

    let mut cred = credential();
    store.save(&cred).unwrap();

    cred.access_token = "access-2".to_string();
    cred.expires_at += Duration::minutes(30);
    store.save(&cred).unwrap();

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.access_token, "access-2");
    assert_eq!(loaded.refresh_token, "refresh-1");
}

#[test]
fn test_corrupt_credential_file_is_storage_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCredentialStore::in_dir(temp_dir.path(), "default").unwrap();
    std::fs::write(store.path(), "{\"access_token\": ").unwrap();

    assert!(matches!(store.load(), Err(CoreError::Storage(_))));
}

#[test]
fn test_profile_isolation() {
    let temp_dir = TempDir::new().unwrap();
    let home = FileCredentialStore::in_dir(temp_dir.path(), "home").unwrap();
    let work = FileCredentialStore::in_dir(temp_dir.path(), "work").unwrap();

    home.save(&credential()).unwrap();
    assert!(work.load().unwrap().is_none());
    assert!(FileCredentialStore::in_dir(temp_dir.path(), "../escape").is_err());
}

//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and the
//! environment.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use fieldsync_domain::FieldSyncError;
use fieldsync_infra::config;
use once_cell::sync::Lazy;
use tempfile::NamedTempFile;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const ENV_KEYS: [&str; 6] = [
    "FIELDSYNC_STORAGE_PATH",
    "FIELDSYNC_API_BASE_URL",
    "FIELDSYNC_API_TOKEN",
    "FIELDSYNC_QUEUE_MAX_RETRIES",
    "FIELDSYNC_SYNC_PERIODIC_SECONDS",
    "FIELDSYNC_SYNC_ON_RECONNECT",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn write_temp(contents: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "storage": { "path": "/tmp/fieldsync_it.db", "pool_size": 2 },
        "api": { "base_url": "https://api.example.com/v1", "auth_token": "abc" },
        "queue": { "dedup_window_ms": 2500 },
        "sync": { "backoff_base_ms": 500, "periodic_interval_seconds": 300 }
    }"#;
    let path = write_temp(json_content, "json");

    let config = config::load_from_file(Some(path.clone())).expect("config loads");

    assert_eq!(config.storage.path, "/tmp/fieldsync_it.db");
    assert_eq!(config.storage.pool_size, 2);
    assert_eq!(config.api.base_url, "https://api.example.com/v1");
    assert_eq!(config.api.auth_token.as_deref(), Some("abc"));
    assert_eq!(config.queue.dedup_window_ms, 2500);
    assert_eq!(config.queue.default_max_retries, 3);
    assert_eq!(config.sync.backoff_base_ms, 500);
    assert_eq!(config.sync.backoff_cap_ms, 30_000);
    assert_eq!(config.sync.periodic_interval_seconds, Some(300));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
[storage]
path = ":memory:"

[sync]
auto_sync_on_reconnect = false
operation_timeout_ms = 10000

[logging]
level = "debug"
json = true
"#;
    let path = write_temp(toml_content, "toml");

    let config = config::load_from_file(Some(path.clone())).expect("config loads");

    assert!(config.storage.is_in_memory());
    assert!(!config.sync.auto_sync_on_reconnect);
    assert_eq!(config.sync.operation_timeout_ms, Some(10_000));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_file_that_fails_validation_is_rejected() {
    let path = write_temp(r#"{ "queue": { "default_max_retries": 0 } }"#, "json");

    let err = config::load_from_file(Some(path.clone())).unwrap_err();
    assert!(matches!(err, FieldSyncError::Config(msg) if msg.contains("default_max_retries")));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_missing_file_is_config_error() {
    let err = config::load_from_file(Some(PathBuf::from("/nonexistent/fieldsync.toml"))).unwrap_err();
    assert!(matches!(err, FieldSyncError::Config(_)));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let path = write_temp("[storage\npath = ", "toml");
    let err = config::load_from_file(Some(path.clone())).unwrap_err();
    assert!(matches!(err, FieldSyncError::Config(msg) if msg.contains("TOML")));
    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_from_env_overlays_defaults() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
    clear_env();

    std::env::set_var("FIELDSYNC_STORAGE_PATH", "/var/lib/fieldsync/state.db");
    std::env::set_var("FIELDSYNC_API_BASE_URL", "https://api.example.com");
    std::env::set_var("FIELDSYNC_API_TOKEN", "secret");
    std::env::set_var("FIELDSYNC_QUEUE_MAX_RETRIES", "5");
    std::env::set_var("FIELDSYNC_SYNC_PERIODIC_SECONDS", "60");
    std::env::set_var("FIELDSYNC_SYNC_ON_RECONNECT", "off");

    let result = config::load_from_env();
    clear_env();

    let config = result.expect("env config loads");
    assert_eq!(config.storage.path, "/var/lib/fieldsync/state.db");
    assert_eq!(config.api.base_url, "https://api.example.com");
    assert_eq!(config.api.auth_token.as_deref(), Some("secret"));
    assert_eq!(config.queue.default_max_retries, 5);
    assert_eq!(config.sync.periodic_interval_seconds, Some(60));
    assert!(!config.sync.auto_sync_on_reconnect);
    assert_eq!(config.sync.backoff_base_ms, 1_000);
}

#[test]
fn test_load_from_env_requires_storage_and_api() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
    clear_env();

    std::env::set_var("FIELDSYNC_API_BASE_URL", "https://api.example.com");
    let result = config::load_from_env();
    clear_env();

    match result {
        Err(FieldSyncError::Config(msg)) => assert!(msg.contains("FIELDSYNC_STORAGE_PATH")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_load_from_env_rejects_invalid_number() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
    clear_env();

    std::env::set_var("FIELDSYNC_STORAGE_PATH", "state.db");
    std::env::set_var("FIELDSYNC_API_BASE_URL", "https://api.example.com");
    std::env::set_var("FIELDSYNC_QUEUE_MAX_RETRIES", "many");
    let result = config::load_from_env();
    clear_env();

    assert!(matches!(result, Err(FieldSyncError::Config(msg)) if msg.contains("FIELDSYNC_QUEUE_MAX_RETRIES")));
}

//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required ones are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, sections and fields that are not given keep their
//! defaults, and the result is validated before it is returned.
//!
//! ## Environment Variables
//! Required:
//! - `FIELDSYNC_STORAGE_PATH`: SQLite file path (`:memory:` for volatile)
//! - `FIELDSYNC_API_BASE_URL`: Remote API base URL
//!
//! Optional:
//! - `FIELDSYNC_STORAGE_POOL_SIZE`
//! - `FIELDSYNC_API_TIMEOUT_SECONDS`, `FIELDSYNC_API_TOKEN`
//! - `FIELDSYNC_QUEUE_DEDUP_WINDOW_MS`, `FIELDSYNC_QUEUE_MAX_RETRIES`
//! - `FIELDSYNC_SYNC_BACKOFF_BASE_MS`, `FIELDSYNC_SYNC_BACKOFF_CAP_MS`
//! - `FIELDSYNC_SYNC_PAUSE_MS`, `FIELDSYNC_SYNC_OPERATION_TIMEOUT_MS`
//! - `FIELDSYNC_SYNC_ON_RECONNECT` (true/false)
//! - `FIELDSYNC_SYNC_PERIODIC_SECONDS`
//! - `FIELDSYNC_LOG_LEVEL`, `FIELDSYNC_LOG_JSON` (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./fieldsync.{json,toml}` or `./config.{json,toml}`
//! 2. The same names one and two directories up
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fieldsync_domain::{Config, FieldSyncError, Result};

const FILE_STEMS: [&str; 2] = ["fieldsync", "config"];
const FILE_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `FieldSyncError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `FieldSyncError::Config` if a required variable is missing, a
/// value does not parse, or the result fails validation.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.storage.path = env_var("FIELDSYNC_STORAGE_PATH")?;
    config.api.base_url = env_var("FIELDSYNC_API_BASE_URL")?;

    if let Some(size) = env_parse("FIELDSYNC_STORAGE_POOL_SIZE")? {
        config.storage.pool_size = size;
    }
    if let Some(secs) = env_parse("FIELDSYNC_API_TIMEOUT_SECONDS")? {
        config.api.timeout_seconds = secs;
    }
    config.api.auth_token = std::env::var("FIELDSYNC_API_TOKEN").ok().filter(|t| !t.is_empty());

    if let Some(ms) = env_parse("FIELDSYNC_QUEUE_DEDUP_WINDOW_MS")? {
        config.queue.dedup_window_ms = ms;
    }
    if let Some(retries) = env_parse("FIELDSYNC_QUEUE_MAX_RETRIES")? {
        config.queue.default_max_retries = retries;
    }

    if let Some(ms) = env_parse("FIELDSYNC_SYNC_BACKOFF_BASE_MS")? {
        config.sync.backoff_base_ms = ms;
    }
    if let Some(ms) = env_parse("FIELDSYNC_SYNC_BACKOFF_CAP_MS")? {
        config.sync.backoff_cap_ms = ms;
    }
    if let Some(ms) = env_parse("FIELDSYNC_SYNC_PAUSE_MS")? {
        config.sync.inter_operation_pause_ms = ms;
    }
    if let Some(ms) = env_parse("FIELDSYNC_SYNC_OPERATION_TIMEOUT_MS")? {
        config.sync.operation_timeout_ms = Some(ms);
    }
    config.sync.auto_sync_on_reconnect =
        env_bool("FIELDSYNC_SYNC_ON_RECONNECT", config.sync.auto_sync_on_reconnect);
    if let Some(secs) = env_parse("FIELDSYNC_SYNC_PERIODIC_SECONDS")? {
        config.sync.periodic_interval_seconds = Some(secs);
    }

    if let Ok(level) = std::env::var("FIELDSYNC_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("FIELDSYNC_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `FieldSyncError::Config` if the file is missing or unreadable,
/// the format is invalid, or the result fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FieldSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FieldSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FieldSyncError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration, detecting the format from the file extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FieldSyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FieldSyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(FieldSyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a config file.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    candidates(&roots).into_iter().find(|path| path.exists())
}

fn candidates(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .flat_map(|root| {
            FILE_STEMS.iter().flat_map(move |stem| {
                FILE_EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .collect()
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        FieldSyncError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable. Unset is `Ok(None)`; set but
/// unparseable is an error.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| FieldSyncError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

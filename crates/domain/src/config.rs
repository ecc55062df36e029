//! Configuration structures
//!
//! Every section falls back to its defaults when omitted from a config file,
//! so a minimal file only has to name what it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BACKOFF_BASE_MS, BACKOFF_CAP_MS, DEDUP_WINDOW_MS, DEFAULT_MAX_RETRIES,
    INTER_OPERATION_PAUSE_MS, OPERATION_TIMEOUT_MS,
};
use crate::errors::{FieldSyncError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub queue: QueueConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate every section.
    ///
    /// # Errors
    /// Returns `FieldSyncError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.api.validate()?;
        self.queue.validate()?;
        self.sync.validate()
    }
}

/// Durable key-value store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file path. `":memory:"` keeps state in-process.
    pub path: String,
    pub pool_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: "fieldsync.db".to_string(), pool_size: 4 }
    }
}

impl StorageConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(FieldSyncError::Config("storage.path must not be empty".into()));
        }
        if self.pool_size == 0 {
            return Err(FieldSyncError::Config("storage.pool_size must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Remote API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Bearer token sent on every request when present.
    pub auth_token: Option<String>,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_seconds: 30,
            auth_token: None,
            user_agent: concat!("fieldsync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FieldSyncError::Config(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(FieldSyncError::Config(
                "api.timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Mutation queue configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Identical requests enqueued within this window are rejected.
    pub dedup_window_ms: u64,
    /// Applied to operations enqueued without an explicit ceiling.
    pub default_max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { dedup_window_ms: DEDUP_WINDOW_MS, default_max_retries: DEFAULT_MAX_RETRIES }
    }
}

impl QueueConfig {
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    /// # Errors
    /// Returns `FieldSyncError::Config` if `default_max_retries` is 0.
    pub fn validate(&self) -> Result<()> {
        if self.default_max_retries == 0 {
            return Err(FieldSyncError::Config(
                "queue.default_max_retries must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Drain and auto-sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub inter_operation_pause_ms: u64,
    /// Per-call ceiling for remote calls. `None` waits indefinitely.
    pub operation_timeout_ms: Option<u64>,
    /// Drain automatically on every offline to online transition.
    pub auto_sync_on_reconnect: bool,
    /// Periodic full sync while online. `None` disables it.
    pub periodic_interval_seconds: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: BACKOFF_BASE_MS,
            backoff_cap_ms: BACKOFF_CAP_MS,
            inter_operation_pause_ms: INTER_OPERATION_PAUSE_MS,
            operation_timeout_ms: Some(OPERATION_TIMEOUT_MS),
            auto_sync_on_reconnect: true,
            periodic_interval_seconds: None,
        }
    }
}

impl SyncConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }

    pub fn inter_operation_pause(&self) -> Duration {
        Duration::from_millis(self.inter_operation_pause_ms)
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    pub fn periodic_interval(&self) -> Option<Duration> {
        self.periodic_interval_seconds.map(Duration::from_secs)
    }

    /// # Errors
    /// Returns `FieldSyncError::Config` for zero timeouts or intervals, or a
    /// cap below the base delay.
    pub fn validate(&self) -> Result<()> {
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err(FieldSyncError::Config(format!(
                "sync.backoff_cap_ms ({}) must not be below sync.backoff_base_ms ({})",
                self.backoff_cap_ms, self.backoff_base_ms
            )));
        }
        if self.operation_timeout_ms == Some(0) {
            return Err(FieldSyncError::Config(
                "sync.operation_timeout_ms must be greater than 0 when set".into(),
            ));
        }
        if self.periodic_interval_seconds == Some(0) {
            return Err(FieldSyncError::Config(
                "sync.periodic_interval_seconds must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

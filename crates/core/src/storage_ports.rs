//! Durable key-value store port

use async_trait::async_trait;
use fieldsync_domain::Result;

/// String key-value store with per-key atomicity only.
///
/// No cross-key transactions are assumed; `remove_many` may be atomic in an
/// adapter but callers must not rely on it.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Absent keys are not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove several keys.
    async fn remove_many(&self, keys: &[&str]) -> Result<()>;
}

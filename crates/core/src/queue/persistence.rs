//! Typed access to the queue's persisted collections

use std::sync::Arc;

use fieldsync_domain::constants::{
    FAILED_QUEUE_KEY, PROCESSING_FLAG_KEY, QUEUE_KEY, STATS_KEY,
};
use fieldsync_domain::{FailedOperation, QueueStats, QueuedOperation, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::queue::metrics::QueueMetrics;
use crate::storage_ports::KeyValueStore;

/// JSON codec over a [`KeyValueStore`].
///
/// Undecodable values read back as `None` and are counted as corrupt reads.
#[derive(Clone)]
pub struct JsonStore {
    store: Arc<dyn KeyValueStore>,
    metrics: Arc<QueueMetrics>,
}

impl JsonStore {
    pub fn new(store: Arc<dyn KeyValueStore>, metrics: Arc<QueueMetrics>) -> Self {
        Self { store, metrics }
    }

    pub fn raw(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Decode the value at `key`. Absent and corrupt values are both `None`.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                self.metrics.record_corrupt_read();
                warn!(key, error = %err, bytes = raw.len(), "Discarding corrupt persisted value");
                Ok(None)
            }
        }
    }

    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        if let Err(err) = self.store.set(key, &encoded).await {
            self.metrics.record_persistence_failure();
            warn!(key, error = %err, "Failed to persist value");
            return Err(err);
        }
        Ok(())
    }

    pub async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        if let Err(err) = self.store.remove_many(keys).await {
            self.metrics.record_persistence_failure();
            return Err(err);
        }
        Ok(())
    }

    pub async fn pending(&self) -> Result<Vec<QueuedOperation>> {
        Ok(self.read(QUEUE_KEY).await?.unwrap_or_default())
    }

    pub async fn save_pending(&self, pending: &[QueuedOperation]) -> Result<()> {
        self.write(QUEUE_KEY, pending).await
    }

    pub async fn failed(&self) -> Result<Vec<FailedOperation>> {
        Ok(self.read(FAILED_QUEUE_KEY).await?.unwrap_or_default())
    }

    pub async fn save_failed(&self, failed: &[FailedOperation]) -> Result<()> {
        self.write(FAILED_QUEUE_KEY, failed).await
    }

    pub async fn stats(&self) -> Result<Option<QueueStats>> {
        self.read(STATS_KEY).await
    }

    pub async fn save_stats(&self, stats: &QueueStats) -> Result<()> {
        self.write(STATS_KEY, stats).await
    }

    /// Stored as the literal strings `"true"` / `"false"`.
    pub async fn processing(&self) -> Result<bool> {
        Ok(self.store.get(PROCESSING_FLAG_KEY).await?.is_some_and(|v| v == "true"))
    }

    pub async fn save_processing(&self, processing: bool) -> Result<()> {
        let value = if processing { "true" } else { "false" };
        if let Err(err) = self.store.set(PROCESSING_FLAG_KEY, value).await {
            self.metrics.record_persistence_failure();
            return Err(err);
        }
        Ok(())
    }
}

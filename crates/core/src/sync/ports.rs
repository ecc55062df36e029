//! Port interfaces for sync operations

use async_trait::async_trait;
use fieldsync_domain::{DatasetKind, Result};
use serde_json::Value;

/// Remote service the queue is replayed against
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Create a resource
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value>;

    /// Replace a resource
    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value>;

    /// Partially update a resource
    async fn patch(&self, endpoint: &str, body: &Value) -> Result<Value>;

    /// Delete a resource (no body)
    async fn delete(&self, endpoint: &str) -> Result<Value>;

    /// Fetch a full reference dataset for the local cache
    async fn fetch_dataset(&self, kind: DatasetKind) -> Result<Value>;
}

//! Deferred write operations and their queue metadata

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::MAX_ERROR_MESSAGE_LEN;
use crate::errors::{FieldSyncError, Result};
use crate::impl_label_conversions;

/// Opaque identifier assigned to an operation at enqueue time.
pub type OperationId = String;

/// What the operation does to the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl_label_conversions!(OperationKind {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// HTTP verb used to replay the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl_label_conversions!(HttpMethod {
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
});

impl HttpMethod {
    /// DELETE is replayed without a body.
    pub fn sends_body(&self) -> bool {
        !matches!(self, Self::Delete)
    }
}

/// Replay priority band. Declaration order is queue order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl_label_conversions!(Priority {
    High => "high",
    Normal => "normal",
    Low => "low",
});

/// Caller-supplied description of a mutation to enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    pub kind: OperationKind,
    pub endpoint: String,
    pub method: HttpMethod,
    pub payload: Value,
    pub priority: Priority,
    /// `None` falls back to the queue's configured default.
    pub max_retries: Option<u32>,
}

impl NewOperation {
    pub fn new(
        kind: OperationKind,
        endpoint: impl Into<String>,
        method: HttpMethod,
        payload: Value,
    ) -> Self {
        Self {
            kind,
            endpoint: endpoint.into(),
            method,
            payload,
            priority: Priority::Normal,
            max_retries: None,
        }
    }

    /// Create a resource (POST).
    pub fn create(endpoint: impl Into<String>, payload: Value) -> Self {
        Self::new(OperationKind::Create, endpoint, HttpMethod::Post, payload)
    }

    /// Replace a resource (PUT).
    pub fn update(endpoint: impl Into<String>, payload: Value) -> Self {
        Self::new(OperationKind::Update, endpoint, HttpMethod::Put, payload)
    }

    /// Partially update a resource (PATCH).
    pub fn patch(endpoint: impl Into<String>, payload: Value) -> Self {
        Self::new(OperationKind::Update, endpoint, HttpMethod::Patch, payload)
    }

    /// Delete a resource (DELETE, no body).
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(OperationKind::Delete, endpoint, HttpMethod::Delete, Value::Null)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Reject operations that could never be replayed.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(FieldSyncError::InvalidInput("Operation endpoint is empty".into()));
        }

        if self.max_retries == Some(0) {
            return Err(FieldSyncError::InvalidInput(
                "Operation max_retries must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// A mutation waiting in the pending queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    pub id: OperationId,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub endpoint: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub payload: Value,
    /// Milliseconds since the Unix epoch.
    pub enqueued_at: i64,
    #[serde(default)]
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub priority: Priority,
}

impl QueuedOperation {
    /// Materialise a caller request into a queue entry.
    pub fn from_new(
        op: NewOperation,
        id: OperationId,
        enqueued_at: i64,
        default_max_retries: u32,
    ) -> Self {
        Self {
            id,
            kind: op.kind,
            endpoint: op.endpoint,
            method: op.method,
            payload: op.payload,
            enqueued_at,
            retry_count: 0,
            max_retries: op.max_retries.unwrap_or(default_max_retries),
            priority: op.priority,
        }
    }

    /// Same endpoint, verb and payload (payload compared by value).
    pub fn is_same_request(&self, endpoint: &str, method: HttpMethod, payload: &Value) -> bool {
        self.endpoint == endpoint && self.method == method && &self.payload == payload
    }

    /// True once the retry ceiling has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Queue ordering key: priority band, then enqueue time.
    pub fn order_key(&self) -> (Priority, i64) {
        (self.priority, self.enqueued_at)
    }

    pub fn enqueued_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.enqueued_at).single()
    }
}

/// An operation that exhausted its retries and awaits manual action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedOperation {
    #[serde(flatten)]
    pub operation: QueuedOperation,
    /// Message of the last failed attempt.
    pub error: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub failed_at: i64,
}

impl FailedOperation {
    pub fn new(operation: QueuedOperation, error: &str, failed_at: i64) -> Self {
        Self { operation, error: truncate_message(error), failed_at }
    }
}

fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_ERROR_MESSAGE_LEN {
        return message.to_string();
    }

    let mut truncated =
        message.chars().take(MAX_ERROR_MESSAGE_LEN.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}

//! Drain results, queue statistics and pull-sync datasets

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::NO_CONNECTION_MESSAGE;
use crate::impl_label_conversions;
use crate::types::operation::QueuedOperation;

/// Persisted progress of the current drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub active: bool,
    pub total: usize,
    pub current: usize,
}

impl SyncState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn in_progress(total: usize, current: usize) -> Self {
        Self { active: true, total, current }
    }
}

/// Queue statistics recomputed after every queue mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: usize,
    pub high_priority: usize,
    pub failed: usize,
    /// Milliseconds since the Unix epoch of the last drain that reached the
    /// remote.
    #[serde(default)]
    pub last_sync: Option<i64>,
}

impl QueueStats {
    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// Why an operation did not go through during a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFailureKind {
    /// The drain was skipped because the device was offline.
    NoConnection,
    /// The attempt failed and a retry is scheduled.
    Transient,
    /// The attempt failed and the operation was quarantined.
    Terminal,
}

impl_label_conversions!(SyncFailureKind {
    NoConnection => "no_connection",
    Transient => "transient",
    Terminal => "terminal",
});

/// One entry of `SyncResult::errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncErrorEntry {
    /// Absent for drain-level entries such as "no connection".
    pub operation: Option<QueuedOperation>,
    pub message: String,
    pub kind: SyncFailureKind,
}

impl SyncErrorEntry {
    pub fn no_connection() -> Self {
        Self {
            operation: None,
            message: NO_CONNECTION_MESSAGE.to_string(),
            kind: SyncFailureKind::NoConnection,
        }
    }

    pub fn for_operation(
        operation: QueuedOperation,
        message: impl Into<String>,
        kind: SyncFailureKind,
    ) -> Self {
        Self { operation: Some(operation), message: message.into(), kind }
    }
}

/// Outcome of a single drain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// False only for drain-level failures outside any single operation.
    pub success: bool,
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<SyncErrorEntry>,
    /// Set when the drain was cancelled before every operation was tried.
    #[serde(default)]
    pub cancelled: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl SyncResult {
    pub fn new(timestamp: i64) -> Self {
        Self {
            success: true,
            processed: 0,
            failed: 0,
            errors: Vec::new(),
            cancelled: false,
            timestamp,
        }
    }

    /// Returned immediately when another drain holds the latch.
    pub fn already_running(timestamp: i64) -> Self {
        Self { success: false, ..Self::new(timestamp) }
    }

    /// Returned when the device is offline; nothing was touched.
    pub fn offline(timestamp: i64) -> Self {
        Self { success: false, errors: vec![SyncErrorEntry::no_connection()], ..Self::new(timestamp) }
    }

    pub fn is_offline(&self) -> bool {
        self.errors.iter().any(|e| e.kind == SyncFailureKind::NoConnection)
    }
}

/// Reference datasets refreshed by pull-sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Products,
    Customers,
    Quotes,
    Sales,
}

impl_label_conversions!(DatasetKind {
    Products => "products",
    Customers => "customers",
    Quotes => "quotes",
    Sales => "sales",
});

impl DatasetKind {
    pub const ALL: [Self; 4] = [Self::Products, Self::Customers, Self::Quotes, Self::Sales];

    /// Remote collection path, e.g. `/products`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Products => "/products",
            Self::Customers => "/customers",
            Self::Quotes => "/quotes",
            Self::Sales => "/sales",
        }
    }

    /// Store key holding the cached JSON array.
    pub fn cache_key(&self) -> &'static str {
        match self {
            Self::Products => "cached_products",
            Self::Customers => "cached_customers",
            Self::Quotes => "cached_quotes",
            Self::Sales => "cached_sales",
        }
    }

    /// Store key holding the last successful refresh time.
    pub fn last_sync_key(&self) -> &'static str {
        match self {
            Self::Products => "last_sync_products",
            Self::Customers => "last_sync_customers",
            Self::Quotes => "last_sync_quotes",
            Self::Sales => "last_sync_sales",
        }
    }
}

/// A dataset that could not be refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFailure {
    pub kind: DatasetKind,
    pub message: String,
}

/// Outcome of a pull-sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSyncReport {
    pub refreshed: Vec<DatasetKind>,
    pub failed: Vec<DatasetFailure>,
    pub skipped_offline: bool,
}

impl PullSyncReport {
    pub fn offline() -> Self {
        Self { skipped_offline: true, ..Self::default() }
    }
}

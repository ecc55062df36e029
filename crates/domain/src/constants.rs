//! Sync engine constants
//!
//! Persistence keys are shared with earlier releases of the mobile client and
//! must not change.

// Persistence keys
pub const QUEUE_KEY: &str = "offline_queue";
pub const FAILED_QUEUE_KEY: &str = "offline_queue_failed";
pub const PROCESSING_FLAG_KEY: &str = "offline_queue_processing";
pub const STATS_KEY: &str = "offline_queue_stats";
pub const SYNC_STATE_KEY: &str = "sync_state";

// Queue defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEDUP_WINDOW_MS: u64 = 5_000;

// Drain defaults
pub const BACKOFF_BASE_MS: u64 = 1_000;
pub const BACKOFF_CAP_MS: u64 = 30_000;
pub const INTER_OPERATION_PAUSE_MS: u64 = 100;
pub const OPERATION_TIMEOUT_MS: u64 = 30_000;

/// Message carried by the single error entry of a drain skipped while offline.
pub const NO_CONNECTION_MESSAGE: &str = "No internet connection";

/// Longest error message kept on a quarantined operation.
pub const MAX_ERROR_MESSAGE_LEN: usize = 512;

//! Persistent mutation queue
//!
//! Write operations created while offline are persisted here, deduplicated
//! within a short window and replayed by priority band, then enqueue time.
//! Operations that exhaust their retries are quarantined until a caller
//! explicitly requeues them.

pub mod errors;
pub mod metrics;
pub mod persistence;
pub mod service;

pub use errors::{QueueError, QueueResult};
pub use metrics::{QueueMetrics, QueueMetricsSnapshot};
pub use service::{FailOutcome, MutationQueue};

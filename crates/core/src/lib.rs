//! # FieldSync Core
//!
//! Offline mutation queue and sync engine - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for storage, connectivity and the
//!   remote API
//! - The persistent mutation queue
//! - The sync orchestrator that drains it
//!
//! ## Architecture Principles
//! - Only depends on `fieldsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Every component is constructed with its ports injected

pub mod queue;
pub mod sync;
pub mod time;

// Infrastructure ports
pub mod connectivity_ports;
pub mod storage_ports;

pub use connectivity_ports::ConnectivityMonitor;
pub use queue::{FailOutcome, MutationQueue, QueueError, QueueMetricsSnapshot, QueueResult};
pub use storage_ports::KeyValueStore;
pub use sync::{DrainOptions, RemoteApi, SyncOrchestrator};
pub use time::{Clock, MockClock, SystemClock};

//! # FieldSync Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - Key-value stores (in-memory and SQLite)
//! - The HTTP client and the REST implementation of the remote API
//! - Connectivity monitors (host-fed and health-probe)
//! - Configuration loading and tracing setup
//! - The auto-sync worker and the composition root
//!
//! ## Architecture
//! - Implements traits defined in `fieldsync-core`
//! - Depends on `fieldsync-domain` and `fieldsync-core`
//! - Contains all "impure" code (I/O, network, background tasks)

pub mod api;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;
pub mod sync;

// Re-export commonly used items
pub use api::RestApiClient;
pub use connectivity::{ProbeConfig, ProbeConnectivity, WatchConnectivity};
pub use context::SyncContext;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
pub use storage::{MemoryStore, SqliteStore};
pub use sync::{AutoSyncConfig, AutoSyncWorker, WorkerError};

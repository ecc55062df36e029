//! Background synchronisation
//!
//! Wires connectivity transitions and an optional periodic tick to the
//! orchestrator's full sync.

pub mod auto_sync;
pub mod errors;

pub use auto_sync::{AutoSyncConfig, AutoSyncWorker};
pub use errors::WorkerError;

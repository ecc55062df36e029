//! Queue draining and reference-data refresh

pub mod backoff;
pub mod options;
pub mod orchestrator;
pub mod ports;

pub use backoff::backoff_delay;
pub use options::{CompleteCallback, DrainOptions, ProgressCallback};
pub use orchestrator::SyncOrchestrator;
pub use ports::RemoteApi;

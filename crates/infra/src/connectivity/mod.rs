//! Connectivity monitor adapters
//!
//! [`WatchConnectivity`] is fed by the host platform. [`ProbeConnectivity`]
//! derives reachability itself by polling a health endpoint.

mod probe;
mod watch;

pub use probe::{ProbeConfig, ProbeConnectivity};
pub use watch::WatchConnectivity;

use serde::{Deserialize, Serialize};

/// Snapshot of the device's network reachability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    pub is_connected: bool,
    /// Transport reported by the platform, e.g. `wifi`, `cellular`, `none`.
    #[serde(rename = "type")]
    pub connection_type: String,
}

impl ConnectivityStatus {
    pub fn online(connection_type: impl Into<String>) -> Self {
        Self { is_connected: true, connection_type: connection_type.into() }
    }

    pub fn offline() -> Self {
        Self { is_connected: false, connection_type: "none".to_string() }
    }
}

impl Default for ConnectivityStatus {
    fn default() -> Self {
        Self::offline()
    }
}

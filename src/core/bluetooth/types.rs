//! Defines shared data structures for the Bluetooth module.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a discovered Bluetooth device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BluetoothDevice {
    /// The friendly name of the device, empty when the remote did not report one
    #[serde(default)]
    pub name: String,
    /// Normalized MAC address, `AA:BB:CC:DD:EE:FF`
    pub address: String,
    /// Service record UUIDs, populated on demand and cleared on rediscovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuids: Option<Vec<String>>,
}

impl BluetoothDevice {
    /// Creates a new BluetoothDevice instance without service records
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            uuids: None,
        }
    }
}

/// RFCOMM socket flavour requested on connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityMode {
    #[default]
    Secure,
    Insecure,
}

/// Snapshot of the live connection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub address: String,
    pub uuid: Uuid,
    pub security_mode: SecurityMode,
    pub managed: bool,
}

/// Identifies one discovery session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a discovery session that ran to natural completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoverySummary {
    pub session: SessionId,
    /// Devices found during the session, in discovery order
    pub devices: Vec<BluetoothDevice>,
}

//! Boundary to the native Bluetooth layer
//! The native side answers calls asynchronously with a JSON value or a
//! `{code, message}` failure, and pushes unsolicited events on a channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::core::bluetooth::types::SecurityMode;

/// Sender half used by a native implementation to deliver events.
pub type EventSender = mpsc::UnboundedSender<NativeEvent>;

/// Receiver half handed to [`BluetoothManager::new`](crate::core::BluetoothManager::new).
pub type EventReceiver = mpsc::UnboundedReceiver<NativeEvent>;

/// Creates the event channel shared by a transport and the manager.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// An operation name plus its arguments, serialized as
/// `{"action": "connect", "args": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "args", rename_all = "camelCase")]
pub enum NativeCommand {
    IsEnabled,
    Enable,
    Disable,
    IsDiscovering,
    StartDiscovery,
    StopDiscovery,
    IsPaired { address: String },
    Pair { address: String },
    Unpair { address: String },
    GetPaired,
    GetUuids { address: String },
    #[serde(rename_all = "camelCase")]
    Connect {
        address: String,
        uuid: String,
        connection_type: SecurityMode,
    },
    Disconnect,
    StartConnectionManager,
    StopConnectionManager,
    Write { bytes: Vec<u8> },
}

impl NativeCommand {
    /// The action name, as the native layer dispatches on it.
    pub fn action(&self) -> &'static str {
        match self {
            Self::IsEnabled => "isEnabled",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::IsDiscovering => "isDiscovering",
            Self::StartDiscovery => "startDiscovery",
            Self::StopDiscovery => "stopDiscovery",
            Self::IsPaired { .. } => "isPaired",
            Self::Pair { .. } => "pair",
            Self::Unpair { .. } => "unpair",
            Self::GetPaired => "getPaired",
            Self::GetUuids { .. } => "getUuids",
            Self::Connect { .. } => "connect",
            Self::Disconnect => "disconnect",
            Self::StartConnectionManager => "startConnectionManager",
            Self::StopConnectionManager => "stopConnectionManager",
            Self::Write { .. } => "write",
        }
    }
}

/// Failure payload returned by the native layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeFailure {
    pub code: i32,
    pub message: String,
}

impl NativeFailure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Unsolicited notifications from the native layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum NativeEvent {
    DiscoveryStarted,
    DiscoveryFinished,
    DeviceFound {
        name: String,
        address: String,
    },
    UuidsFound {
        name: String,
        address: String,
        uuids: Vec<String>,
    },
    DeviceBonded {
        name: String,
        address: String,
    },
    ConnectionLost {
        message: String,
    },
    DataRead {
        bytes: Vec<u8>,
    },
    AdapterLost,
}

/// Native Bluetooth primitives the session core is built on.
#[async_trait::async_trait]
pub trait NativeTransport: Send + Sync {
    /// Runs one native operation and resolves with its result.
    async fn call(&self, command: NativeCommand) -> Result<Value, NativeFailure>;
}

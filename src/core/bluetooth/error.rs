//! Error taxonomy for the session core
//! Every failing operation returns exactly one of these to its caller.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

use crate::core::bluetooth::constants::error_codes;
use crate::core::bluetooth::transport::NativeFailure;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Bluetooth adapter is off")]
    AdapterOff,

    #[error("Bluetooth adapter is busy with another operation")]
    AdapterBusy,

    #[error("Bluetooth adapter was lost")]
    AdapterLost,

    #[error("A discovery session is already active")]
    DiscoveryAlreadyActive,

    #[error("Discovery timed out")]
    DiscoveryTimeout,

    #[error("Discovery was cancelled")]
    DiscoveryCancelled,

    #[error("There is no discovery to cancel")]
    NoActiveDiscovery,

    #[error("Connection failed: {reason}")]
    ConnectFailed { reason: String },

    #[error("A connection already exists")]
    AlreadyConnected,

    #[error("There is no connection")]
    NotConnected,

    #[error("There is no managed connection")]
    NotManaged,

    #[error("The connection is already managed")]
    AlreadyManaged,

    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Pairing process is already in progress")]
    PairingInProgress,

    #[error("Pairing failed: {reason}")]
    PairingFailed { reason: String },

    #[error("UUID fetching is already in progress")]
    UuidFetchInProgress,

    #[error("UUID fetching failed: {reason}")]
    UuidFetchFailed { reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Native transport error {code}: {message}")]
    TransportError { code: i32, message: String },
}

impl BridgeError {
    /// Maps a failure payload from the native layer into the taxonomy.
    pub fn from_native(failure: NativeFailure) -> Self {
        let NativeFailure { code, message } = failure;
        match code {
            error_codes::CONNECTING_FAILED => Self::ConnectFailed { reason: message },
            error_codes::CONNECTION_LOST | error_codes::MANAGED_CONNECTION_LOST => {
                Self::ConnectionLost { reason: message }
            }
            error_codes::BLUETOOTH_LOST => Self::AdapterLost,
            error_codes::PAIRING_FAILED => Self::PairingFailed { reason: message },
            error_codes::UUID_FETCH_FAILED => Self::UuidFetchFailed { reason: message },
            _ => Self::TransportError { code, message },
        }
    }

    /// Numeric code reported to the host.
    pub fn code(&self) -> i32 {
        match self {
            Self::AdapterOff => error_codes::ADAPTER_OFF,
            Self::AdapterBusy => error_codes::ADAPTER_BUSY,
            Self::AdapterLost => error_codes::BLUETOOTH_LOST,
            Self::DiscoveryAlreadyActive => error_codes::DISCOVERY_ALREADY_ACTIVE,
            Self::DiscoveryTimeout => error_codes::REQUEST_TIMED_OUT,
            Self::DiscoveryCancelled => error_codes::DISCOVERY_CANCELED,
            Self::NoActiveDiscovery => error_codes::UNKNOWN,
            Self::ConnectFailed { .. } => error_codes::CONNECTING_FAILED,
            Self::AlreadyConnected | Self::AlreadyManaged => error_codes::CONNECTION_ALREADY_EXISTS,
            Self::NotConnected | Self::NotManaged => error_codes::CONNECTION_DOESNT_EXIST,
            Self::ConnectionLost { .. } => error_codes::CONNECTION_LOST,
            Self::PairingInProgress => error_codes::PAIRING_IN_PROGRESS,
            Self::PairingFailed { .. } => error_codes::PAIRING_FAILED,
            Self::UuidFetchInProgress => error_codes::UUID_FETCHING_IN_PROGRESS,
            Self::UuidFetchFailed { .. } => error_codes::UUID_FETCH_FAILED,
            Self::InvalidArgument(_) => error_codes::INVALID_ARGUMENT,
            Self::TransportError { code, .. } => *code,
        }
    }

    /// Stable variant name, used as the `kind` field of the host payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AdapterOff => "AdapterOff",
            Self::AdapterBusy => "AdapterBusy",
            Self::AdapterLost => "AdapterLost",
            Self::DiscoveryAlreadyActive => "DiscoveryAlreadyActive",
            Self::DiscoveryTimeout => "DiscoveryTimeout",
            Self::DiscoveryCancelled => "DiscoveryCancelled",
            Self::NoActiveDiscovery => "NoActiveDiscovery",
            Self::ConnectFailed { .. } => "ConnectFailed",
            Self::AlreadyConnected => "AlreadyConnected",
            Self::NotConnected => "NotConnected",
            Self::NotManaged => "NotManaged",
            Self::AlreadyManaged => "AlreadyManaged",
            Self::ConnectionLost { .. } => "ConnectionLost",
            Self::PairingInProgress => "PairingInProgress",
            Self::PairingFailed { .. } => "PairingFailed",
            Self::UuidFetchInProgress => "UuidFetchInProgress",
            Self::UuidFetchFailed { .. } => "UuidFetchFailed",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::TransportError { .. } => "TransportError",
        }
    }
}

/// Serialized as `{ "code", "kind", "message" }` so the web side can switch
/// on the same codes the native bridge always reported.
impl Serialize for BridgeError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut payload = serializer.serialize_struct("BridgeError", 3)?;
        payload.serialize_field("code", &self.code())?;
        payload.serialize_field("kind", self.kind())?;
        payload.serialize_field("message", &self.to_string())?;
        payload.end()
    }
}

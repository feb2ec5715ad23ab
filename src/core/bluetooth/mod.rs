//! Bluetooth session core
//! This module owns the adapter state machine, the discovery session, the
//! single managed connection and the facade that serializes them.

mod adapter;
mod connection;
mod constants;
mod discovery;
mod error;
mod events;
mod manager;
mod payload;
mod pending;
pub mod simulated;
mod transport;
mod types;

// Re-export types that should be publicly accessible
pub use adapter::AdapterState;
pub use connection::InboundStream;
pub use constants::*; // Re-export all constants
pub use discovery::{DiscoveryHandle, DiscoveryOutcome};
pub use error::BridgeError;
pub use manager::BluetoothManager;
pub use payload::{TextEncoding, WritePayload};
pub use transport::{
    EventReceiver, EventSender, NativeCommand, NativeEvent, NativeFailure, NativeTransport,
    event_channel,
};
pub use types::{BluetoothDevice, ConnectionInfo, DiscoverySummary, SecurityMode, SessionId};

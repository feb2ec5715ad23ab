//! Core functionality for the session bridge
//! This module contains the Bluetooth session core and its native boundary.

pub mod bluetooth;

// Re-export commonly used types
pub use bluetooth::{AdapterState, BluetoothManager, BridgeError};

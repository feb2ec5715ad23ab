//! Constants used throughout the session core
//! This module contains the constant values shared by the bluetooth modules,
//! such as default timeouts, channel sizes and the numeric error codes
//! understood by the web side of the bridge.

/// Default discovery session timeout in milliseconds
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 15_000;

/// Default time to wait for a bond confirmation after a pairing request
pub const DEFAULT_PAIRING_TIMEOUT_MS: u64 = 30_000;

/// Default time to wait for an SDP service record lookup
pub const DEFAULT_UUID_FETCH_TIMEOUT_MS: u64 = 15_000;

/// Capacity of the adapter state broadcast channel
pub const STATE_CHANNEL_CAPACITY: usize = 64;

/// Reason reported to a connect caller whose attempt was cancelled
pub const CONNECT_CANCELLED_REASON: &str = "connection attempt cancelled";

/// Reported by every operation after the manager has been shut down
pub const SHUT_DOWN_REASON: &str = "bridge shut down";

/// Error codes reported to the host, shared with the native layer.
pub mod error_codes {
    pub const UNKNOWN: i32 = 0;
    pub const DISCOVERY_CANCELED: i32 = 1;
    pub const PAIRING_IN_PROGRESS: i32 = 3;
    pub const UUID_FETCHING_IN_PROGRESS: i32 = 4;
    pub const CONNECTION_ALREADY_EXISTS: i32 = 5;
    pub const CONNECTION_DOESNT_EXIST: i32 = 7;
    pub const CONNECTION_LOST: i32 = 8;
    pub const CONNECTING_FAILED: i32 = 9;
    pub const PAIRING_FAILED: i32 = 10;
    pub const UUID_FETCH_FAILED: i32 = 11;
    pub const BLUETOOTH_LOST: i32 = 12;
    pub const MANAGED_CONNECTION_LOST: i32 = 13;
    pub const INVALID_ARGUMENT: i32 = 15;
    pub const ADAPTER_OFF: i32 = 16;
    pub const ADAPTER_BUSY: i32 = 17;
    pub const DISCOVERY_ALREADY_ACTIVE: i32 = 18;
    pub const REQUEST_TIMED_OUT: i32 = 9001;
}

//! Native event pump
//! Applies unsolicited native events to the session state, one at a time,
//! under the same lock the manager's operations take.

use std::sync::Weak;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::error::BridgeError;
use crate::core::bluetooth::manager::{SessionState, Shared};
use crate::core::bluetooth::transport::{EventReceiver, NativeEvent};
use crate::core::bluetooth::types::BluetoothDevice;
use crate::utils::normalize_address;

/// Runs until shutdown, until the event channel closes or until the manager is dropped.
pub(crate) async fn run_event_pump(
    shared: Weak<Shared>,
    mut events: EventReceiver,
    shutdown: CancellationToken,
) {
    info!("Native event pump started");
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    debug!("Native event channel closed");
                    break;
                }
            },
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let mut state = shared.state.lock().await;
        handle_event(&mut state, event);
    }
    info!("Native event pump stopped");
}

pub(crate) fn handle_event(state: &mut SessionState, event: NativeEvent) {
    match event {
        NativeEvent::DiscoveryStarted => {
            debug!("Native discovery started");
            state.discovery.mark_native_started();
        }
        NativeEvent::DiscoveryFinished => {
            if state.discovery.accepts_native_finish() {
                state.end_discovery(None, Ok(()));
            } else {
                debug!("Ignoring discovery finish that belongs to an earlier session");
            }
        }
        NativeEvent::DeviceFound { name, address } => match normalize_address(&address) {
            Ok(address) => {
                debug!("Device found: {} ({})", name, address);
                state.discovery.record(BluetoothDevice::new(name, address));
            }
            Err(e) => warn!("Dropping device report: {}", e),
        },
        NativeEvent::UuidsFound {
            name,
            address,
            uuids,
        } => match normalize_address(&address) {
            Ok(address) => {
                debug!("{} service record(s) found for {}", uuids.len(), address);
                state.discovery.set_uuids(&name, &address, uuids.clone());
                state.pending.uuids.resolve(&address, Ok(uuids));
            }
            Err(e) => warn!("Dropping service records: {}", e),
        },
        NativeEvent::DeviceBonded { name, address } => match normalize_address(&address) {
            Ok(address) => {
                info!("Bonded with {} ({})", name, address);
                let device = state
                    .discovery
                    .device(&address)
                    .cloned()
                    .unwrap_or_else(|| BluetoothDevice::new(name, address.clone()));
                state.pending.pairing.resolve(&address, Ok(device));
            }
            Err(e) => warn!("Dropping bond report: {}", e),
        },
        NativeEvent::ConnectionLost { message } => {
            if state.connection.is_connected() {
                warn!("Connection lost: {}", message);
                state.connection_lost(BridgeError::ConnectionLost { reason: message });
            } else {
                debug!("Connection lost reported with no connection: {}", message);
            }
        }
        NativeEvent::DataRead { bytes } => {
            state.connection.deliver(bytes);
        }
        NativeEvent::AdapterLost => state.adapter_lost(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::adapter::AdapterState;

    fn found(address: &str) -> NativeEvent {
        NativeEvent::DeviceFound {
            name: "Foo".into(),
            address: address.into(),
        }
    }

    #[tokio::test]
    async fn finish_before_started_acknowledgement_is_stale() {
        let mut state = SessionState::new(AdapterState::Ready);
        state.adapter.transition(AdapterState::Busy).unwrap();
        let (handle, _) = state.discovery.begin(Box::new(|_: &BluetoothDevice| {})).unwrap();

        handle_event(&mut state, NativeEvent::DiscoveryFinished);
        assert!(state.discovery.is_active());

        handle_event(&mut state, NativeEvent::DiscoveryStarted);
        handle_event(&mut state, found("aa:bb:cc:dd:ee:ff"));
        handle_event(&mut state, NativeEvent::DiscoveryFinished);
        assert!(!state.discovery.is_active());
        assert_eq!(state.adapter.current(), AdapterState::Ready);

        let summary = handle.finished().await.unwrap();
        assert_eq!(summary.devices[0].address, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn malformed_addresses_are_dropped() {
        let mut state = SessionState::new(AdapterState::Ready);
        handle_event(&mut state, found("not-an-address"));
        assert!(state.discovery.devices().is_empty());
    }

    #[tokio::test]
    async fn adapter_lost_fails_everything_and_ends_off() {
        let mut state = SessionState::new(AdapterState::Ready);
        state.adapter.transition(AdapterState::Busy).unwrap();
        let (handle, _) = state.discovery.begin(Box::new(|_: &BluetoothDevice| {})).unwrap();
        let (_, pairing) = state.pending.pairing.begin("AA:BB:CC:DD:EE:FF").unwrap();

        handle_event(&mut state, NativeEvent::AdapterLost);

        assert_eq!(state.adapter.current(), AdapterState::Off);
        assert_eq!(handle.finished().await, Err(BridgeError::AdapterLost));
        assert_eq!(pairing.await.unwrap(), Err(BridgeError::AdapterLost));
    }
}

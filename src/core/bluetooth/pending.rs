//! Single-flight requests completed by native events
//! Pairing and service record lookups are started with a native call but
//! only finish when the matching event arrives, so the caller parks on a
//! oneshot registered here.

use log::debug;
use tokio::sync::oneshot;

use crate::core::bluetooth::error::BridgeError;
use crate::core::bluetooth::types::BluetoothDevice;

pub type Reply<T> = oneshot::Receiver<Result<T, BridgeError>>;

/// Identifies one request for the lifetime of its slot.
pub type Ticket = u64;

struct Waiter<T> {
    ticket: Ticket,
    address: String,
    reply: oneshot::Sender<Result<T, BridgeError>>,
}

/// At most one outstanding request of a kind.
pub struct RequestSlot<T> {
    waiter: Option<Waiter<T>>,
    next_ticket: Ticket,
    busy: BridgeError,
}

impl<T> RequestSlot<T> {
    /// `busy` is returned when a second request is made while one is outstanding.
    pub fn new(busy: BridgeError) -> Self {
        Self {
            waiter: None,
            next_ticket: 0,
            busy,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.waiter.is_some()
    }

    pub fn begin(&mut self, address: &str) -> Result<(Ticket, Reply<T>), BridgeError> {
        if self.waiter.is_some() {
            return Err(self.busy.clone());
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let (reply, rx) = oneshot::channel();
        self.waiter = Some(Waiter {
            ticket,
            address: address.to_string(),
            reply,
        });
        Ok((ticket, rx))
    }

    /// Completes the request for `address`. Events for other addresses are ignored.
    pub fn resolve(&mut self, address: &str, result: Result<T, BridgeError>) -> bool {
        match &self.waiter {
            Some(waiter) if waiter.address == address => {}
            _ => {
                debug!("No outstanding request for {}", address);
                return false;
            }
        }
        match self.waiter.take() {
            Some(waiter) => {
                let _ = waiter.reply.send(result);
                true
            }
            None => false,
        }
    }

    /// Frees the slot if `ticket` still holds it. A newer request is left alone.
    pub fn abandon(&mut self, ticket: Ticket) -> bool {
        if self.waiter.as_ref().map(|waiter| waiter.ticket) == Some(ticket) {
            self.waiter = None;
            true
        } else {
            false
        }
    }

    /// Fails whatever request is outstanding.
    pub fn fail(&mut self, err: BridgeError) {
        if let Some(waiter) = self.waiter.take() {
            let _ = waiter.reply.send(Err(err));
        }
    }
}

pub struct PendingRequests {
    pub pairing: RequestSlot<BluetoothDevice>,
    pub uuids: RequestSlot<Vec<String>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            pairing: RequestSlot::new(BridgeError::PairingInProgress),
            uuids: RequestSlot::new(BridgeError::UuidFetchInProgress),
        }
    }

    pub fn fail_all(&mut self, err: BridgeError) {
        self.pairing.fail(err.clone());
        self.uuids.fail(err);
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_matching_address_resolves() {
        let mut pending = PendingRequests::new();
        let (_, reply) = pending.pairing.begin("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(
            pending.pairing.begin("AA:BB:CC:DD:EE:FF").unwrap_err(),
            BridgeError::PairingInProgress
        );

        let device = BluetoothDevice::new("Foo", "AA:BB:CC:DD:EE:FF");
        assert!(!pending.pairing.resolve("11:22:33:44:55:66", Ok(device.clone())));
        assert!(pending.pairing.resolve("AA:BB:CC:DD:EE:FF", Ok(device.clone())));
        assert_eq!(reply.await.unwrap(), Ok(device));
        assert!(!pending.pairing.is_pending());
    }

    #[tokio::test]
    async fn fail_all_reaches_every_waiter() {
        let mut pending = PendingRequests::new();
        let (_, pairing) = pending.pairing.begin("AA:BB:CC:DD:EE:FF").unwrap();
        let (_, uuids) = pending.uuids.begin("11:22:33:44:55:66").unwrap();
        pending.fail_all(BridgeError::AdapterLost);
        assert_eq!(pairing.await.unwrap(), Err(BridgeError::AdapterLost));
        assert_eq!(uuids.await.unwrap(), Err(BridgeError::AdapterLost));
    }

    #[test]
    fn stale_ticket_leaves_newer_request_alone() {
        let mut pending = PendingRequests::new();
        let (first, _reply) = pending.uuids.begin("AA:BB:CC:DD:EE:FF").unwrap();
        assert!(pending.uuids.abandon(first));

        let (second, _reply) = pending.uuids.begin("AA:BB:CC:DD:EE:FF").unwrap();
        assert!(!pending.uuids.abandon(first));
        assert!(pending.uuids.is_pending());
        assert!(pending.uuids.abandon(second));
        assert!(!pending.uuids.is_pending());
    }
}

//! Discovery session bookkeeping
//! Owns at most one discovery session and the cache of every device seen so
//! far. The manager drives it from inside its serialized state.

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::error::BridgeError;
use crate::core::bluetooth::types::{BluetoothDevice, DiscoverySummary, SessionId};

/// Invoked once per newly found address within a session.
pub type DeviceCallback = Box<dyn FnMut(&BluetoothDevice) + Send>;

pub type DiscoveryOutcome = Result<DiscoverySummary, BridgeError>;

/// Caller side of a running discovery session.
#[derive(Debug)]
pub struct DiscoveryHandle {
    id: SessionId,
    outcome: oneshot::Receiver<DiscoveryOutcome>,
}

impl DiscoveryHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Resolves with the terminal outcome of the session.
    pub async fn finished(self) -> DiscoveryOutcome {
        self.outcome
            .await
            .unwrap_or(Err(BridgeError::DiscoveryCancelled))
    }
}

struct DiscoverySession {
    id: SessionId,
    found: Vec<String>,
    seen: HashSet<String>,
    native_started: bool,
    timer: CancellationToken,
    on_device_found: DeviceCallback,
    outcome: oneshot::Sender<DiscoveryOutcome>,
}

#[derive(Default)]
pub struct DiscoveryController {
    session: Option<DiscoverySession>,
    known: HashMap<String, BluetoothDevice>,
    next_id: u64,
}

impl DiscoveryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    #[cfg(test)]
    pub fn active_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    /// Opens a new session. The returned token cancels the session's timeout task.
    pub fn begin(
        &mut self,
        on_device_found: DeviceCallback,
    ) -> Result<(DiscoveryHandle, CancellationToken), BridgeError> {
        if self.session.is_some() {
            return Err(BridgeError::DiscoveryAlreadyActive);
        }
        self.next_id += 1;
        let id = SessionId(self.next_id);
        let (tx, rx) = oneshot::channel();
        let timer = CancellationToken::new();
        self.session = Some(DiscoverySession {
            id,
            found: Vec::new(),
            seen: HashSet::new(),
            native_started: false,
            timer: timer.clone(),
            on_device_found,
            outcome: tx,
        });
        info!("Discovery session {} opened", id);
        Ok((DiscoveryHandle { id, outcome: rx }, timer))
    }

    /// The native layer acknowledged the start of discovery.
    pub fn mark_native_started(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.native_started = true;
        }
    }

    /// Whether a native "finished" event may end the current session.
    pub fn accepts_native_finish(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.native_started)
            .unwrap_or(false)
    }

    /// Caches the device and notifies the session the first time its address
    /// shows up. Returns whether the callback fired.
    pub fn record(&mut self, device: BluetoothDevice) -> bool {
        let address = device.address.clone();
        // Replacing the record drops any UUIDs fetched for the old one.
        self.known.insert(address.clone(), device);

        let Some(session) = self.session.as_mut() else {
            debug!("Device {} reported outside a discovery session", address);
            return false;
        };
        if !session.seen.insert(address.clone()) {
            debug!("Device {} rediscovered in session {}", address, session.id);
            return false;
        }
        session.found.push(address.clone());
        if let Some(device) = self.known.get(&address) {
            (session.on_device_found)(device);
        }
        true
    }

    /// Ends the session if `id` matches it (`None` matches any session).
    /// A finished session delivers `outcome` to its handle; errors are passed
    /// through, `Ok` is turned into a summary of the found devices.
    pub fn finish(&mut self, id: Option<SessionId>, outcome: Result<(), BridgeError>) -> bool {
        let matches = match (&self.session, id) {
            (Some(session), Some(id)) => session.id == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return false;
        }
        let Some(session) = self.session.take() else {
            return false;
        };
        session.timer.cancel();

        let result = outcome.map(|()| DiscoverySummary {
            session: session.id,
            devices: session
                .found
                .iter()
                .filter_map(|address| self.known.get(address).cloned())
                .collect(),
        });
        match &result {
            Ok(summary) => info!(
                "Discovery session {} finished with {} device(s)",
                session.id,
                summary.devices.len()
            ),
            Err(e) => info!("Discovery session {} ended: {}", session.id, e),
        }
        // The caller may have dropped its handle.
        let _ = session.outcome.send(result);
        true
    }

    pub fn devices(&self) -> Vec<BluetoothDevice> {
        let mut devices: Vec<_> = self.known.values().cloned().collect();
        devices.sort_by(|a, b| a.address.cmp(&b.address));
        devices
    }

    pub fn device(&self, address: &str) -> Option<&BluetoothDevice> {
        self.known.get(address)
    }

    pub fn cached_uuids(&self, address: &str) -> Option<Vec<String>> {
        self.known.get(address).and_then(|device| device.uuids.clone())
    }

    /// Stores fetched service records, adding the device if it was never discovered.
    pub fn set_uuids(&mut self, name: &str, address: &str, uuids: Vec<String>) {
        self.known
            .entry(address.to_string())
            .or_insert_with(|| BluetoothDevice::new(name, address))
            .uuids = Some(uuids);
    }
}

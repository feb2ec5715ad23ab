//! Connection bookkeeping
//! Holds the single live connection, the in-flight connect attempt and the
//! managed read channel. The manager drives it from inside its serialized
//! state; nothing here talks to the native layer.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::error::BridgeError;
use crate::core::bluetooth::types::ConnectionInfo;

/// Fired exactly once when a managed connection drops unexpectedly.
pub type LostCallback = Box<dyn FnOnce(BridgeError) + Send>;

/// Inbound chunks of a managed connection. Ends when the connection stops
/// being managed; it cannot be restarted.
#[derive(Debug)]
pub struct InboundStream {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Stream for InboundStream {
    type Item = Vec<u8>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct ManagedLink {
    data: mpsc::UnboundedSender<Vec<u8>>,
    on_lost: Option<LostCallback>,
}

struct ActiveConnection {
    info: ConnectionInfo,
    managed: Option<ManagedLink>,
}

struct PendingAttempt {
    id: u64,
    address: String,
    cancel: CancellationToken,
}

#[derive(Default)]
pub struct ConnectionManager {
    active: Option<ActiveConnection>,
    pending: Option<PendingAttempt>,
    next_attempt: u64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_connecting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_managed(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| active.managed.is_some())
            .unwrap_or(false)
    }

    pub fn info(&self) -> Option<ConnectionInfo> {
        self.active.as_ref().map(|active| ConnectionInfo {
            managed: active.managed.is_some(),
            ..active.info.clone()
        })
    }

    fn pending_id(&self) -> Option<u64> {
        self.pending.as_ref().map(|pending| pending.id)
    }

    /// Registers a connect attempt. The token is cancelled by [`Self::cancel_attempt`].
    pub fn begin_attempt(&mut self, address: &str) -> Result<(u64, CancellationToken), BridgeError> {
        if self.active.is_some() {
            return Err(BridgeError::AlreadyConnected);
        }
        if self.pending.is_some() {
            return Err(BridgeError::AdapterBusy);
        }
        self.next_attempt += 1;
        let cancel = CancellationToken::new();
        self.pending = Some(PendingAttempt {
            id: self.next_attempt,
            address: address.to_string(),
            cancel: cancel.clone(),
        });
        debug!("Connect attempt {} to {} registered", self.next_attempt, address);
        Ok((self.next_attempt, cancel))
    }

    /// Stores the connection if attempt `id` is still the pending one.
    /// Returns false when the attempt was cancelled in the meantime.
    pub fn complete_attempt(&mut self, id: u64, info: ConnectionInfo) -> bool {
        if self.pending_id() != Some(id) {
            warn!("Discarding late completion of connect attempt {}", id);
            return false;
        }
        self.pending = None;
        info!("Connected to {} ({})", info.address, info.uuid);
        self.active = Some(ActiveConnection {
            info,
            managed: None,
        });
        true
    }

    /// Drops attempt `id` after a native failure. Returns false if it was
    /// already cancelled.
    pub fn abandon_attempt(&mut self, id: u64) -> bool {
        if self.pending_id() != Some(id) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Cancels the in-flight attempt, if any.
    pub fn cancel_attempt(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                info!("Cancelling connect attempt {} to {}", pending.id, pending.address);
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Checks that a managed read can be started on the live connection.
    pub fn ensure_can_manage(&self) -> Result<(), BridgeError> {
        match &self.active {
            None => Err(BridgeError::NotConnected),
            Some(active) if active.managed.is_some() => Err(BridgeError::AlreadyManaged),
            Some(_) => Ok(()),
        }
    }

    pub fn start_managed(&mut self, on_lost: LostCallback) -> Result<InboundStream, BridgeError> {
        self.ensure_can_manage()?;
        let active = self.active.as_mut().ok_or(BridgeError::NotConnected)?;
        let (data, rx) = mpsc::unbounded_channel();
        active.managed = Some(ManagedLink {
            data,
            on_lost: Some(on_lost),
        });
        info!("Managed connection started for {}", active.info.address);
        Ok(InboundStream { rx })
    }

    /// Leaves managed mode; the inbound stream ends and the lost callback is dropped unfired.
    pub fn stop_managed(&mut self) -> Result<(), BridgeError> {
        let active = self.active.as_mut().ok_or(BridgeError::NotManaged)?;
        match active.managed.take() {
            Some(_) => {
                info!("Managed connection stopped for {}", active.info.address);
                Ok(())
            }
            None => Err(BridgeError::NotManaged),
        }
    }

    pub fn ensure_managed(&self) -> Result<(), BridgeError> {
        if self.is_managed() {
            Ok(())
        } else {
            Err(BridgeError::NotManaged)
        }
    }

    /// Forwards an inbound chunk to the managed stream.
    pub fn deliver(&mut self, bytes: Vec<u8>) -> bool {
        let Some(link) = self.active.as_ref().and_then(|active| active.managed.as_ref()) else {
            debug!("Dropping {} inbound byte(s): connection is not managed", bytes.len());
            return false;
        };
        if link.data.send(bytes).is_err() {
            debug!("Inbound stream was dropped by its consumer");
            return false;
        }
        true
    }

    /// Removes the live connection. With `lost` set, a managed connection's
    /// lost callback fires with that error.
    pub fn teardown(&mut self, lost: Option<BridgeError>) -> Option<ConnectionInfo> {
        let active = self.active.take()?;
        let mut info = active.info;
        info.managed = active.managed.is_some();
        if let (Some(mut link), Some(reason)) = (active.managed, lost) {
            if let Some(on_lost) = link.on_lost.take() {
                on_lost(reason);
            }
        }
        info!("Connection to {} torn down", info.address);
        Some(info)
    }
}

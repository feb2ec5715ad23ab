//! Bluetooth manager for the session bridge
//! This module provides the single asynchronous entry point for every
//! Bluetooth operation. All mutable session state sits behind one mutex;
//! operations check and claim state under the lock, release it while the
//! native layer works, and re-acquire it to commit the outcome.

use std::sync::Arc;

use futures_util::stream::BoxStream;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep, timeout};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::core::bluetooth::adapter::{AdapterState, AdapterStateMachine};
use crate::core::bluetooth::connection::{ConnectionManager, InboundStream};
use crate::core::bluetooth::constants::{CONNECT_CANCELLED_REASON, SHUT_DOWN_REASON, error_codes};
use crate::core::bluetooth::discovery::{DiscoveryController, DiscoveryHandle};
use crate::core::bluetooth::error::BridgeError;
use crate::core::bluetooth::events::run_event_pump;
use crate::core::bluetooth::payload::WritePayload;
use crate::core::bluetooth::pending::{PendingRequests, Reply, RequestSlot, Ticket};
use crate::core::bluetooth::transport::{
    EventReceiver, NativeCommand, NativeFailure, NativeTransport,
};
use crate::core::bluetooth::types::{BluetoothDevice, ConnectionInfo, SecurityMode, SessionId};
use crate::utils::normalize_address;

/// Everything the serialized context owns.
pub(crate) struct SessionState {
    pub(crate) adapter: AdapterStateMachine,
    pub(crate) discovery: DiscoveryController,
    pub(crate) connection: ConnectionManager,
    pub(crate) pending: PendingRequests,
}

impl SessionState {
    pub(crate) fn new(initial: AdapterState) -> Self {
        Self {
            adapter: AdapterStateMachine::new(initial),
            discovery: DiscoveryController::new(),
            connection: ConnectionManager::new(),
            pending: PendingRequests::new(),
        }
    }

    /// Ends the discovery session and hands the adapter back.
    pub(crate) fn end_discovery(
        &mut self,
        id: Option<SessionId>,
        outcome: Result<(), BridgeError>,
    ) -> bool {
        if !self.discovery.finish(id, outcome) {
            return false;
        }
        if self.adapter.current() == AdapterState::Busy {
            let _ = self.adapter.transition(AdapterState::Ready);
        }
        true
    }

    /// The transport reported the live connection as gone.
    pub(crate) fn connection_lost(&mut self, reason: BridgeError) {
        if self.connection.teardown(Some(reason)).is_some()
            && self.adapter.current() == AdapterState::Connected
        {
            let _ = self.adapter.transition(AdapterState::Ready);
        }
    }

    /// The radio went away: every pending operation fails and the adapter ends Off.
    pub(crate) fn adapter_lost(&mut self) {
        warn!("Bluetooth adapter lost");
        self.discovery.finish(None, Err(BridgeError::AdapterLost));
        self.pending.fail_all(BridgeError::AdapterLost);
        self.connection.cancel_attempt();
        self.connection.teardown(Some(BridgeError::AdapterLost));
        self.adapter.power_lost();
    }

    /// What an interrupted connect attempt reports to its caller.
    fn interrupted_connect(&self) -> BridgeError {
        if self.adapter.current() == AdapterState::Off {
            BridgeError::AdapterLost
        } else {
            BridgeError::ConnectFailed {
                reason: CONNECT_CANCELLED_REASON.to_string(),
            }
        }
    }
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<SessionState>,
    transport: Arc<dyn NativeTransport>,
    config: BridgeConfig,
    shutdown: CancellationToken,
}

/// Manages Bluetooth operations
#[derive(Clone)]
pub struct BluetoothManager {
    shared: Arc<Shared>,
}

impl BluetoothManager {
    /// Creates a new BluetoothManager on top of `transport`, whose unsolicited
    /// events arrive on `events`. The initial adapter state is read from the
    /// native layer.
    pub async fn new(
        transport: Arc<dyn NativeTransport>,
        events: EventReceiver,
        config: BridgeConfig,
    ) -> Result<Self, BridgeError> {
        let enabled = transport
            .call(NativeCommand::IsEnabled)
            .await
            .map_err(BridgeError::from_native)?;
        let initial = if enabled.as_bool().unwrap_or(false) {
            AdapterState::Ready
        } else {
            AdapterState::Off
        };
        info!("Bluetooth manager starting with adapter {:?}", initial);

        let shutdown = CancellationToken::new();
        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState::new(initial)),
            transport,
            config,
            shutdown: shutdown.clone(),
        });
        tokio::spawn(run_event_pump(Arc::downgrade(&shared), events, shutdown));

        Ok(Self { shared })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.shared.state.lock().await
    }

    /// Fails once `shutdown` has run. Checked under the lock by every
    /// operation that claims state or talks to the native layer.
    fn ensure_open(&self) -> Result<(), BridgeError> {
        if self.shared.shutdown.is_cancelled() {
            return Err(BridgeError::TransportError {
                code: error_codes::UNKNOWN,
                message: SHUT_DOWN_REASON.to_string(),
            });
        }
        Ok(())
    }

    async fn call(&self, command: NativeCommand) -> Result<Value, BridgeError> {
        let action = command.action();
        debug!("Native call: {}", action);
        self.shared
            .transport
            .call(command)
            .await
            .map_err(|failure| native_error(action, failure))
    }

    /// Fires a native call whose failure no longer matters to any caller.
    async fn call_quietly(&self, command: NativeCommand) {
        let action = command.action();
        if let Err(e) = self.call(command).await {
            warn!("Ignoring failed native {}: {}", action, e);
        }
    }

    pub async fn current_state(&self) -> AdapterState {
        self.lock().await.adapter.current()
    }

    /// The current adapter state followed by every later transition.
    pub async fn state_changes(&self) -> BoxStream<'static, AdapterState> {
        self.lock().await.adapter.subscribe()
    }

    /// Powers the adapter on. A no-op when it is already on.
    pub async fn enable(&self) -> Result<(), BridgeError> {
        let manager = self.clone();
        detach(async move { manager.power_on().await }).await
    }

    async fn power_on(&self) -> Result<(), BridgeError> {
        {
            let mut state = self.lock().await;
            self.ensure_open()?;
            match state.adapter.current() {
                AdapterState::Ready | AdapterState::Connected => return Ok(()),
                AdapterState::Busy => return Err(BridgeError::AdapterBusy),
                AdapterState::Off => state.adapter.transition(AdapterState::Busy)?,
            }
        }
        info!("Enabling Bluetooth adapter");
        let result = self.call(NativeCommand::Enable).await;

        let mut state = self.lock().await;
        if state.adapter.current() != AdapterState::Busy {
            return Err(BridgeError::AdapterLost);
        }
        match result {
            Ok(_) => state.adapter.transition(AdapterState::Ready),
            Err(e) => {
                state.adapter.transition(AdapterState::Off)?;
                Err(e)
            }
        }
    }

    /// Powers the adapter off, closing the live connection first. A no-op when already off.
    pub async fn disable(&self) -> Result<(), BridgeError> {
        let manager = self.clone();
        detach(async move { manager.power_off().await }).await
    }

    async fn power_off(&self) -> Result<(), BridgeError> {
        self.ensure_open()?;
        if self.current_state().await == AdapterState::Connected {
            self.disconnect().await?;
        }
        {
            let mut state = self.lock().await;
            self.ensure_open()?;
            match state.adapter.current() {
                AdapterState::Off => return Ok(()),
                AdapterState::Ready => state.adapter.transition(AdapterState::Busy)?,
                other => return Err(other.rejection()),
            }
        }
        info!("Disabling Bluetooth adapter");
        let result = self.call(NativeCommand::Disable).await;

        let mut state = self.lock().await;
        if state.adapter.current() != AdapterState::Busy {
            // Lost while powering down; the adapter is already Off.
            return Ok(());
        }
        match result {
            Ok(_) => {
                state.pending.fail_all(BridgeError::AdapterOff);
                state.adapter.transition(AdapterState::Off)
            }
            Err(e) => {
                state.adapter.transition(AdapterState::Ready)?;
                Err(e)
            }
        }
    }

    /// Opens a discovery session. `on_device_found` runs once per new address;
    /// the returned handle resolves when the session ends.
    pub async fn start_discovery<F>(&self, on_device_found: F) -> Result<DiscoveryHandle, BridgeError>
    where
        F: FnMut(&BluetoothDevice) + Send + 'static,
    {
        let (handle, timer) = {
            let mut state = self.lock().await;
            self.ensure_open()?;
            if state.discovery.is_active() {
                return Err(BridgeError::DiscoveryAlreadyActive);
            }
            state.adapter.require_ready()?;
            let session = state.discovery.begin(Box::new(on_device_found))?;
            state.adapter.transition(AdapterState::Busy)?;
            session
        };
        let id = handle.id();

        let manager = self.clone();
        let deadline = self.shared.config.discovery_timeout();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = sleep(deadline) => {
                    warn!("Discovery session {} timed out after {:?}", id, deadline);
                    manager
                        .finish_discovery(id, Err(BridgeError::DiscoveryTimeout), true)
                        .await;
                }
            }
        });

        if let Err(e) = self.call(NativeCommand::StartDiscovery).await {
            self.finish_discovery(id, Err(e.clone()), false).await;
            return Err(e);
        }
        info!("Discovery session {} started", id);
        Ok(handle)
    }

    /// Cancels session `id`; its handle resolves with `DiscoveryCancelled`.
    pub async fn stop_discovery(&self, id: SessionId) -> Result<(), BridgeError> {
        if self
            .finish_discovery(id, Err(BridgeError::DiscoveryCancelled), true)
            .await
        {
            Ok(())
        } else {
            Err(BridgeError::NoActiveDiscovery)
        }
    }

    async fn finish_discovery(
        &self,
        id: SessionId,
        outcome: Result<(), BridgeError>,
        stop_native: bool,
    ) -> bool {
        if !self.lock().await.end_discovery(Some(id), outcome) {
            return false;
        }
        if stop_native {
            self.call_quietly(NativeCommand::StopDiscovery).await;
        }
        true
    }

    pub async fn is_discovering(&self) -> bool {
        self.lock().await.discovery.is_active()
    }

    /// Every device seen so far, sorted by address.
    pub async fn devices(&self) -> Vec<BluetoothDevice> {
        self.lock().await.discovery.devices()
    }

    pub async fn device(&self, address: &str) -> Result<Option<BluetoothDevice>, BridgeError> {
        let address = normalize_address(address)?;
        Ok(self.lock().await.discovery.device(&address).cloned())
    }

    /// Bonds with `address`, resolving once the native layer reports the bond.
    pub async fn pair(&self, address: &str) -> Result<BluetoothDevice, BridgeError> {
        let address = normalize_address(address)?;
        let (ticket, reply) = {
            let mut state = self.lock().await;
            self.ensure_open()?;
            state.adapter.require_available()?;
            state.pending.pairing.begin(&address)?
        };
        info!("Pairing with {}", address);
        let manager = self.clone();
        let request = async move { manager.request_bond(address, reply).await };
        self.drive_request(ticket, pairing_slot, request).await
    }

    async fn request_bond(
        &self,
        address: String,
        reply: Reply<BluetoothDevice>,
    ) -> Result<BluetoothDevice, BridgeError> {
        self.call(NativeCommand::Pair {
            address: address.clone(),
        })
        .await
        .map_err(|e| match e {
            BridgeError::TransportError { message, .. } => BridgeError::PairingFailed { reason: message },
            other => other,
        })?;

        let limit = self.shared.config.pairing_timeout();
        self.await_reply(reply, limit).await.unwrap_or_else(|| {
            Err(BridgeError::PairingFailed {
                reason: format!("no bond with {} within {:?}", address, limit),
            })
        })
    }

    pub async fn unpair(&self, address: &str) -> Result<(), BridgeError> {
        let address = normalize_address(address)?;
        self.ensure_open()?;
        self.lock().await.adapter.require_available()?;
        self.call(NativeCommand::Unpair { address }).await?;
        Ok(())
    }

    pub async fn is_paired(&self, address: &str) -> Result<bool, BridgeError> {
        let address = normalize_address(address)?;
        self.ensure_open()?;
        self.lock().await.adapter.require_available()?;
        let value = self.call(NativeCommand::IsPaired { address }).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn paired_devices(&self) -> Result<Vec<BluetoothDevice>, BridgeError> {
        self.ensure_open()?;
        self.lock().await.adapter.require_available()?;
        let value = self.call(NativeCommand::GetPaired).await?;
        let devices: Vec<BluetoothDevice> =
            serde_json::from_value(value).map_err(|e| BridgeError::TransportError {
                code: error_codes::UNKNOWN,
                message: format!("malformed paired device list: {e}"),
            })?;
        devices
            .into_iter()
            .map(|device| {
                Ok(BluetoothDevice {
                    address: normalize_address(&device.address)?,
                    ..device
                })
            })
            .collect()
    }

    /// Service record UUIDs of `address`, fetched from the remote device unless cached.
    pub async fn get_uuids(&self, address: &str) -> Result<Vec<String>, BridgeError> {
        let address = normalize_address(address)?;
        let (ticket, reply) = {
            let mut state = self.lock().await;
            self.ensure_open()?;
            state.adapter.require_available()?;
            if let Some(uuids) = state.discovery.cached_uuids(&address) {
                debug!("Using cached service records for {}", address);
                return Ok(uuids);
            }
            state.pending.uuids.begin(&address)?
        };
        info!("Fetching service records of {}", address);
        let manager = self.clone();
        let request = async move { manager.request_uuids(address, reply).await };
        self.drive_request(ticket, uuids_slot, request).await
    }

    async fn request_uuids(
        &self,
        address: String,
        reply: Reply<Vec<String>>,
    ) -> Result<Vec<String>, BridgeError> {
        self.call(NativeCommand::GetUuids {
            address: address.clone(),
        })
        .await
        .map_err(|e| match e {
            BridgeError::TransportError { message, .. } => BridgeError::UuidFetchFailed { reason: message },
            other => other,
        })?;

        let limit = self.shared.config.uuid_fetch_timeout();
        self.await_reply(reply, limit).await.unwrap_or_else(|| {
            Err(BridgeError::UuidFetchFailed {
                reason: format!("no service records from {} within {:?}", address, limit),
            })
        })
    }

    /// Runs a claimed pairing or UUID request on its own task. The request's
    /// slot is released when it fails or times out, and when the caller drops
    /// this future before the reply arrives.
    async fn drive_request<T, Fut>(
        &self,
        ticket: Ticket,
        slot: fn(&mut PendingRequests) -> &mut RequestSlot<T>,
        request: Fut,
    ) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, BridgeError>> + Send + 'static,
    {
        let dropped = CancellationToken::new();
        let _release_on_drop = dropped.clone().drop_guard();
        let manager = self.clone();
        detach(async move {
            let outcome = tokio::select! {
                biased;
                _ = dropped.cancelled() => Err(BridgeError::TransportError {
                    code: error_codes::UNKNOWN,
                    message: "request dropped by its caller".to_string(),
                }),
                outcome = request => outcome,
            };
            if outcome.is_err() {
                let mut state = manager.lock().await;
                if slot(&mut state.pending).abandon(ticket) {
                    debug!("Released request {}", ticket);
                }
            }
            outcome
        })
        .await
    }

    /// `None` on timeout.
    async fn await_reply<T>(
        &self,
        reply: Reply<T>,
        limit: Duration,
    ) -> Option<Result<T, BridgeError>> {
        match timeout(limit, reply).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(_)) => Some(Err(BridgeError::AdapterOff)),
            Err(_) => None,
        }
    }

    /// Opens an RFCOMM connection to `uuid` on `address`.
    pub async fn connect(
        &self,
        address: &str,
        uuid: &str,
        security_mode: SecurityMode,
    ) -> Result<ConnectionInfo, BridgeError> {
        let address = normalize_address(address)?;
        let uuid = Uuid::parse_str(uuid.trim())
            .map_err(|e| BridgeError::InvalidArgument(format!("invalid service UUID {uuid:?}: {e}")))?;

        let (attempt, cancel) = {
            let mut state = self.lock().await;
            self.ensure_open()?;
            state.adapter.require_ready()?;
            let attempt = state.connection.begin_attempt(&address)?;
            state.adapter.transition(AdapterState::Busy)?;
            attempt
        };
        info!("Connecting to {} ({}, {:?})", address, uuid, security_mode);

        // Dropping the caller's future cancels the attempt like a disconnect.
        let _cancel_on_drop = cancel.clone().drop_guard();
        let manager = self.clone();
        detach(async move {
            manager
                .run_connect(attempt, cancel, address, uuid, security_mode)
                .await
        })
        .await
    }

    async fn run_connect(
        &self,
        attempt: u64,
        cancel: CancellationToken,
        address: String,
        uuid: Uuid,
        security_mode: SecurityMode,
    ) -> Result<ConnectionInfo, BridgeError> {
        let command = NativeCommand::Connect {
            address: address.clone(),
            uuid: uuid.to_string(),
            connection_type: security_mode,
        };
        let mut call = self.spawn_call(command);
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            joined = &mut call => Some(joined),
        };
        let Some(joined) = joined else {
            self.reap_cancelled_connect(call);
            let mut state = self.lock().await;
            let err = state.interrupted_connect();
            // Still registered: the caller went away without a disconnect.
            if state.connection.abandon_attempt(attempt) {
                if state.adapter.current() == AdapterState::Busy {
                    state.adapter.transition(AdapterState::Ready)?;
                }
                drop(state);
                warn!("Connect attempt {} to {} dropped by its caller", attempt, address);
                self.call_quietly(NativeCommand::Disconnect).await;
            }
            return Err(err);
        };
        let result = match joined {
            Ok(result) => result.map_err(|failure| native_error("connect", failure)),
            Err(e) => Err(BridgeError::TransportError {
                code: error_codes::UNKNOWN,
                message: format!("connect task failed: {e}"),
            }),
        };

        let mut state = self.lock().await;
        match result {
            Ok(_) => {
                let info = ConnectionInfo {
                    address,
                    uuid,
                    security_mode,
                    managed: false,
                };
                if !state.connection.complete_attempt(attempt, info.clone()) {
                    let err = state.interrupted_connect();
                    drop(state);
                    self.close_stray_connection().await;
                    return Err(err);
                }
                state.adapter.transition(AdapterState::Connected)?;
                Ok(info)
            }
            Err(e) => {
                if !state.connection.abandon_attempt(attempt) {
                    return Err(state.interrupted_connect());
                }
                if state.adapter.current() == AdapterState::Busy {
                    state.adapter.transition(AdapterState::Ready)?;
                }
                warn!("Connecting to {} failed: {}", address, e);
                Err(match e {
                    BridgeError::ConnectFailed { .. } | BridgeError::AdapterLost => e,
                    BridgeError::TransportError { message, .. } => BridgeError::ConnectFailed { reason: message },
                    other => BridgeError::ConnectFailed {
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    fn spawn_call(&self, command: NativeCommand) -> JoinHandle<Result<Value, NativeFailure>> {
        let transport = self.shared.transport.clone();
        tokio::spawn(async move { transport.call(command).await })
    }

    /// Waits out a cancelled connect in the background and closes the socket
    /// if the native layer opened it anyway.
    fn reap_cancelled_connect(&self, call: JoinHandle<Result<Value, NativeFailure>>) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Ok(Ok(_)) = call.await {
                manager.close_stray_connection().await;
            }
        });
    }

    async fn close_stray_connection(&self) {
        let idle = {
            let state = self.lock().await;
            !state.connection.is_connected() && !state.connection.is_connecting()
        };
        if idle {
            warn!("Closing a connection that completed after its attempt was cancelled");
            self.call_quietly(NativeCommand::Disconnect).await;
        }
    }

    /// Closes the live connection or cancels the attempt in flight.
    /// Succeeds without doing anything when there is neither.
    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        {
            let mut state = self.lock().await;
            if state.connection.cancel_attempt() {
                if state.adapter.current() == AdapterState::Busy {
                    state.adapter.transition(AdapterState::Ready)?;
                }
            } else if let Some(info) = state.connection.teardown(None) {
                info!("Disconnecting from {}", info.address);
                if state.adapter.current() == AdapterState::Connected {
                    state.adapter.transition(AdapterState::Ready)?;
                }
            } else {
                debug!("Disconnect requested with no connection");
                return Ok(());
            }
        }
        self.call_quietly(NativeCommand::Disconnect).await;
        Ok(())
    }

    /// Switches the live connection into managed mode. Inbound data arrives on
    /// the returned stream; `on_connection_lost` fires once if the link drops.
    pub async fn start_managed<F>(&self, on_connection_lost: F) -> Result<InboundStream, BridgeError>
    where
        F: FnOnce(BridgeError) + Send + 'static,
    {
        self.ensure_open()?;
        self.lock().await.connection.ensure_can_manage()?;
        self.call(NativeCommand::StartConnectionManager).await?;
        self.lock()
            .await
            .connection
            .start_managed(Box::new(on_connection_lost))
    }

    pub async fn stop_managed(&self) -> Result<(), BridgeError> {
        self.lock().await.connection.stop_managed()?;
        self.call_quietly(NativeCommand::StopConnectionManager).await;
        Ok(())
    }

    /// Sends `payload` over the managed connection, returning the number of bytes written.
    pub async fn write(&self, payload: WritePayload) -> Result<usize, BridgeError> {
        self.ensure_open()?;
        self.lock().await.connection.ensure_managed()?;
        let bytes = payload.into_bytes()?;
        let written = bytes.len();
        self.call(NativeCommand::Write { bytes }).await?;
        debug!("Wrote {} byte(s)", written);
        Ok(written)
    }

    pub async fn is_connected(&self) -> bool {
        self.lock().await.connection.is_connected()
    }

    pub async fn is_connection_managed(&self) -> bool {
        self.lock().await.connection.is_managed()
    }

    pub async fn connection(&self) -> Option<ConnectionInfo> {
        self.lock().await.connection.info()
    }

    /// Stops the event pump and unwinds every session: discovery is cancelled,
    /// pending requests fail, a connect in flight is cancelled and the live
    /// connection is closed.
    pub async fn shutdown(&self) {
        info!("Shutting down Bluetooth manager");
        self.shared.shutdown.cancel();
        let (discovering, connected) = {
            let mut state = self.lock().await;
            let discovering = state.end_discovery(None, Err(BridgeError::DiscoveryCancelled));
            state.pending.pairing.fail(BridgeError::PairingFailed {
                reason: SHUT_DOWN_REASON.to_string(),
            });
            state.pending.uuids.fail(BridgeError::UuidFetchFailed {
                reason: SHUT_DOWN_REASON.to_string(),
            });
            let cancelled = state.connection.cancel_attempt();
            if cancelled && state.adapter.current() == AdapterState::Busy {
                let _ = state.adapter.transition(AdapterState::Ready);
            }
            let closed = state.connection.teardown(None).is_some();
            if closed && state.adapter.current() == AdapterState::Connected {
                let _ = state.adapter.transition(AdapterState::Ready);
            }
            (discovering, cancelled || closed)
        };
        if discovering {
            self.call_quietly(NativeCommand::StopDiscovery).await;
        }
        if connected {
            self.call_quietly(NativeCommand::Disconnect).await;
        }
    }
}

/// Runs `op` on its own task, so dropping the caller's future never strands
/// state that `op` has claimed.
fn detach<T, Fut>(op: Fut) -> impl Future<Output = Result<T, BridgeError>>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, BridgeError>> + Send + 'static,
{
    let task = tokio::spawn(op);
    async move {
        match task.await {
            Ok(result) => result,
            Err(e) => Err(BridgeError::TransportError {
                code: error_codes::UNKNOWN,
                message: format!("bluetooth task failed: {e}"),
            }),
        }
    }
}

fn pairing_slot(pending: &mut PendingRequests) -> &mut RequestSlot<BluetoothDevice> {
    &mut pending.pairing
}

fn uuids_slot(pending: &mut PendingRequests) -> &mut RequestSlot<Vec<String>> {
    &mut pending.uuids
}

fn native_error(action: &str, failure: NativeFailure) -> BridgeError {
    warn!(
        "Native {} failed with code {}: {}",
        action, failure.code, failure.message
    );
    BridgeError::from_native(failure)
}

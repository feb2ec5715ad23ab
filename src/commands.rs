//! Tauri commands
//! This module defines all the commands that can be invoked from the frontend.
//! Every command fails with a serialized [`BridgeError`].

use futures_util::StreamExt;
use log::warn;
use serde::Serialize;
use serde_json::Value;
use tauri::{AppHandle, Emitter, Runtime, State};

use crate::core::bluetooth::{
    AdapterState, BluetoothDevice, BridgeError, ConnectionInfo, SecurityMode, SessionId,
    TextEncoding, WritePayload,
};
use crate::state::AppState;

/// Payload of the `discovery-finished` event.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryFinished {
    session: SessionId,
    devices: Option<Vec<BluetoothDevice>>,
    error: Option<BridgeError>,
}

/// Payload of the `data-read` event.
#[derive(Debug, Clone, Serialize)]
pub struct DataRead {
    bytes: Vec<u8>,
}

fn emit<R: Runtime, S: Serialize + Clone>(app: &AppHandle<R>, event: &str, payload: S) {
    if let Err(e) = app.emit(event, payload) {
        warn!("Failed to emit {}: {}", event, e);
    }
}

#[tauri::command]
pub async fn enable(app_state: State<'_, AppState>) -> Result<(), BridgeError> {
    app_state.bluetooth_manager.enable().await
}

#[tauri::command]
pub async fn disable(app_state: State<'_, AppState>) -> Result<(), BridgeError> {
    app_state.bluetooth_manager.disable().await
}

#[tauri::command]
pub async fn get_state(app_state: State<'_, AppState>) -> Result<AdapterState, BridgeError> {
    Ok(app_state.bluetooth_manager.current_state().await)
}

/// Starts discovering devices with real-time updates through events
///
/// # Returns
/// The session id, used to stop the session. Emits:
/// - "device-found" with device details once per discovered address
/// - "discovery-finished" when the session ends, with the devices or the error
#[tauri::command]
pub async fn start_discovery<R: Runtime>(
    app: AppHandle<R>,
    app_state: State<'_, AppState>,
) -> Result<SessionId, BridgeError> {
    let found_app = app.clone();
    let handle = app_state
        .bluetooth_manager
        .start_discovery(move |device: &BluetoothDevice| {
            emit(&found_app, "device-found", device.clone());
        })
        .await?;

    let session = handle.id();
    tauri::async_runtime::spawn(async move {
        let payload = match handle.finished().await {
            Ok(summary) => DiscoveryFinished {
                session,
                devices: Some(summary.devices),
                error: None,
            },
            Err(e) => DiscoveryFinished {
                session,
                devices: None,
                error: Some(e),
            },
        };
        emit(&app, "discovery-finished", payload);
    });
    Ok(session)
}

#[tauri::command]
pub async fn stop_discovery(
    session: SessionId,
    app_state: State<'_, AppState>,
) -> Result<(), BridgeError> {
    app_state.bluetooth_manager.stop_discovery(session).await
}

#[tauri::command]
pub async fn is_discovering(app_state: State<'_, AppState>) -> Result<bool, BridgeError> {
    Ok(app_state.bluetooth_manager.is_discovering().await)
}

#[tauri::command]
pub async fn devices(app_state: State<'_, AppState>) -> Result<Vec<BluetoothDevice>, BridgeError> {
    Ok(app_state.bluetooth_manager.devices().await)
}

#[tauri::command]
pub async fn pair(
    address: String,
    app_state: State<'_, AppState>,
) -> Result<BluetoothDevice, BridgeError> {
    app_state.bluetooth_manager.pair(&address).await
}

#[tauri::command]
pub async fn unpair(address: String, app_state: State<'_, AppState>) -> Result<(), BridgeError> {
    app_state.bluetooth_manager.unpair(&address).await
}

#[tauri::command]
pub async fn is_paired(address: String, app_state: State<'_, AppState>) -> Result<bool, BridgeError> {
    app_state.bluetooth_manager.is_paired(&address).await
}

#[tauri::command]
pub async fn paired_devices(
    app_state: State<'_, AppState>,
) -> Result<Vec<BluetoothDevice>, BridgeError> {
    app_state.bluetooth_manager.paired_devices().await
}

#[tauri::command]
pub async fn get_uuids(
    address: String,
    app_state: State<'_, AppState>,
) -> Result<Vec<String>, BridgeError> {
    app_state.bluetooth_manager.get_uuids(&address).await
}

/// Connects to a Bluetooth device
///
/// # Arguments
/// * `address` - MAC address of the device
/// * `uuid` - Service record UUID to open the socket on
/// * `security_mode` - Secure or Insecure, the configured default when omitted
#[tauri::command]
pub async fn connect(
    address: String,
    uuid: String,
    security_mode: Option<SecurityMode>,
    app_state: State<'_, AppState>,
) -> Result<ConnectionInfo, BridgeError> {
    let manager = &app_state.bluetooth_manager;
    let security_mode = security_mode.unwrap_or(manager.config().default_security_mode);
    manager.connect(&address, &uuid, security_mode).await
}

#[tauri::command]
pub async fn disconnect(app_state: State<'_, AppState>) -> Result<(), BridgeError> {
    app_state.bluetooth_manager.disconnect().await
}

/// Switches the connection into managed mode. Inbound data is emitted as
/// "data-read"; an unexpected drop is emitted once as "connection-lost".
#[tauri::command]
pub async fn start_managed<R: Runtime>(
    app: AppHandle<R>,
    app_state: State<'_, AppState>,
) -> Result<(), BridgeError> {
    let lost_app = app.clone();
    let mut inbound = app_state
        .bluetooth_manager
        .start_managed(move |reason| emit(&lost_app, "connection-lost", reason))
        .await?;

    tauri::async_runtime::spawn(async move {
        while let Some(bytes) = inbound.next().await {
            emit(&app, "data-read", DataRead { bytes });
        }
    });
    Ok(())
}

#[tauri::command]
pub async fn stop_managed(app_state: State<'_, AppState>) -> Result<(), BridgeError> {
    app_state.bluetooth_manager.stop_managed().await
}

/// Writes to the managed connection
///
/// # Arguments
/// * `data` - A string, a number or an array of byte values
/// * `encoding` - Text encoding name, the configured default when omitted
/// * `force_string` - Send numbers as their text form
#[tauri::command]
pub async fn write(
    data: Value,
    encoding: Option<String>,
    force_string: Option<bool>,
    app_state: State<'_, AppState>,
) -> Result<usize, BridgeError> {
    let manager = &app_state.bluetooth_manager;
    let encoding = match encoding {
        Some(name) => name.parse::<TextEncoding>()?,
        None => manager.config().default_encoding,
    };
    let payload = WritePayload::from_json(&data, encoding, force_string.unwrap_or(false))?;
    manager.write(payload).await
}

#[tauri::command]
pub async fn is_connected(app_state: State<'_, AppState>) -> Result<bool, BridgeError> {
    Ok(app_state.bluetooth_manager.is_connected().await)
}

#[tauri::command]
pub async fn is_connection_managed(app_state: State<'_, AppState>) -> Result<bool, BridgeError> {
    Ok(app_state.bluetooth_manager.is_connection_managed().await)
}

#[tauri::command]
pub async fn connection(
    app_state: State<'_, AppState>,
) -> Result<Option<ConnectionInfo>, BridgeError> {
    Ok(app_state.bluetooth_manager.connection().await)
}

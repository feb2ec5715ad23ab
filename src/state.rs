//! Application state management
//! This module defines the state the `bluetooth` plugin keeps in the Tauri app.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use futures_util::StreamExt;
use log::{info, warn};
use tauri::{AppHandle, Emitter, Runtime};

use crate::config::BridgeConfig;
use crate::core::BluetoothManager;
use crate::core::bluetooth::{EventReceiver, NativeTransport};

/// Plugin state
pub struct AppState {
    /// The Bluetooth manager instance
    pub bluetooth_manager: BluetoothManager,
}

impl AppState {
    /// Creates a new AppState instance, reading the bridge config from `config_dir`.
    pub async fn new(
        transport: Arc<dyn NativeTransport>,
        events: EventReceiver,
        config_dir: &Path,
    ) -> Result<Self> {
        let config = match BridgeConfig::load_config(config_dir).await {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load bluetooth config, using default: {}", e);
                BridgeConfig::default()
            }
        };
        info!("Initializing BluetoothManager...");
        let bluetooth_manager = BluetoothManager::new(transport, events, config).await?;
        Ok(Self { bluetooth_manager })
    }

    /// Forwards adapter state changes to the web view as `adapter-state` events.
    pub async fn forward_state_changes<R: Runtime>(&self, app_handle: AppHandle<R>) {
        let mut states = self.bluetooth_manager.state_changes().await;
        tauri::async_runtime::spawn(async move {
            while let Some(state) = states.next().await {
                if let Err(e) = app_handle.emit("adapter-state", state) {
                    warn!("Failed to emit adapter state: {}", e);
                }
            }
        });
    }
}

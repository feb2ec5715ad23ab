//! Bluetooth session bridge library
//! The session core lives in [`core`]; with the `tauri` feature the crate also
//! ships as the `bluetooth` Tauri plugin.

// Module declarations
pub mod config;
pub mod core;
pub mod logging;
pub mod utils;

#[cfg(feature = "tauri")]
pub mod commands;
#[cfg(feature = "tauri")]
pub mod state;

#[cfg(feature = "tauri")]
pub use plugin::init;

#[cfg(feature = "tauri")]
mod plugin {
    use std::sync::Arc;

    use log::{Level, debug, info};
    use tauri::plugin::{Builder, TauriPlugin};
    use tauri::{Manager, Runtime};

    use crate::commands;
    use crate::logging::TauriLogger;
    use crate::core::bluetooth::{EventReceiver, NativeTransport};
    use crate::state::AppState;

    /// Builds the `bluetooth` plugin on top of a native transport and its event channel.
    pub fn init<R: Runtime>(
        transport: Arc<dyn NativeTransport>,
        events: EventReceiver,
    ) -> TauriPlugin<R> {
        Builder::new("bluetooth")
            .invoke_handler(tauri::generate_handler![
                commands::enable,
                commands::disable,
                commands::get_state,
                commands::start_discovery,
                commands::stop_discovery,
                commands::is_discovering,
                commands::devices,
                commands::pair,
                commands::unpair,
                commands::is_paired,
                commands::paired_devices,
                commands::get_uuids,
                commands::connect,
                commands::disconnect,
                commands::start_managed,
                commands::stop_managed,
                commands::write,
                commands::is_connected,
                commands::is_connection_managed,
                commands::connection,
            ])
            .setup(move |app, _api| {
                if let Err(e) = TauriLogger::init(app.clone(), Level::Info) {
                    debug!("Keeping the host's logger, log-message forwarding is off: {}", e);
                }
                let config_dir = app.path().app_config_dir()?;
                let app_handle = app.clone();
                let app_state = tauri::async_runtime::block_on(async move {
                    info!("Starting AppState initialization in plugin setup.");
                    let app_state = AppState::new(transport, events, &config_dir).await?;
                    app_state.forward_state_changes(app_handle).await;
                    Ok::<_, anyhow::Error>(app_state)
                })
                .map_err(|e| format!("Failed to initialize BluetoothManager: {}", e))?;
                app.manage(app_state);
                Ok(())
            })
            .build()
    }
}

//! Headless walk-through of a full session against the in-process native layer.

use anyhow::{Context, Result, anyhow};
use bluetooth_session_bridge_lib::config::BridgeConfig;
use bluetooth_session_bridge_lib::core::bluetooth::simulated::SimulatedTransport;
use bluetooth_session_bridge_lib::core::bluetooth::{
    BluetoothDevice, BluetoothManager, SecurityMode, WritePayload,
};
use bluetooth_session_bridge_lib::logging;
use futures_util::StreamExt;
use log::{LevelFilter, info, warn};

const DEMO_ADDRESS: &str = "00:11:22:33:44:55";
const SERIAL_PORT_UUID: &str = "00001101-0000-1000-8000-00805f9b34fb";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init(LevelFilter::Info)?;

    let (transport, events) = SimulatedTransport::with_events();
    transport.set_enabled(false);
    transport.add_device("Serial Adapter", DEMO_ADDRESS, &[SERIAL_PORT_UUID]);
    transport.add_device("Headset", "AA:BB:CC:DD:EE:FF", &[]);

    let manager = BluetoothManager::new(transport.clone(), events, BridgeConfig::default()).await?;
    let mut states = manager.state_changes().await;
    tokio::spawn(async move {
        while let Some(state) = states.next().await {
            info!("Adapter state: {:?}", state);
        }
    });

    manager.enable().await?;

    let handle = manager
        .start_discovery(|device: &BluetoothDevice| info!("Found {} ({})", device.name, device.address))
        .await?;
    let summary = handle.finished().await?;
    info!("Discovery found {} device(s)", summary.devices.len());

    let uuids = manager.get_uuids(DEMO_ADDRESS).await?;
    let uuid = uuids
        .first()
        .ok_or_else(|| anyhow!("{} advertises no services", DEMO_ADDRESS))?;

    let connection = manager
        .connect(DEMO_ADDRESS, uuid, SecurityMode::Secure)
        .await
        .context("connecting to the serial adapter")?;
    info!("Connected: {:?}", connection);

    let mut inbound = manager
        .start_managed(|reason| warn!("Connection lost: {}", reason))
        .await?;
    let written = manager.write(WritePayload::text("hello")).await?;
    info!("Wrote {} byte(s)", written);

    transport.receive(b"world");
    if let Some(bytes) = inbound.next().await {
        info!("Received {:?}", String::from_utf8_lossy(&bytes));
    }

    manager.disconnect().await?;
    manager.shutdown().await;
    Ok(())
}

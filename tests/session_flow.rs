//! End-to-end session behavior against the in-process native layer.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bluetooth_session_bridge_lib::config::BridgeConfig;
use bluetooth_session_bridge_lib::core::bluetooth::simulated::{
    ConnectBehavior, DiscoveryMode, SimulatedTransport,
};
use bluetooth_session_bridge_lib::core::bluetooth::{
    AdapterState, BluetoothDevice, BluetoothManager, BridgeError, NativeCommand, NativeFailure,
    NativeTransport, SecurityMode, TextEncoding, WritePayload, error_codes,
};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::time::timeout;

const FOO: &str = "AA:BB:CC:DD:EE:FF";
const SPP: &str = "00001101-0000-1000-8000-00805f9b34fb";

async fn setup() -> (BluetoothManager, Arc<SimulatedTransport>) {
    let (sim, events) = SimulatedTransport::with_events();
    sim.add_device("Foo", FOO, &[SPP]);
    let manager = BluetoothManager::new(sim.clone(), events, BridgeConfig::default())
        .await
        .unwrap();
    (manager, sim)
}

async fn connected() -> (BluetoothManager, Arc<SimulatedTransport>) {
    let (manager, sim) = setup().await;
    manager.connect(FOO, SPP, SecurityMode::Secure).await.unwrap();
    (manager, sim)
}

/// Polls `check` until it holds; events are applied by a background task.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..1000 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition never held");
}

async fn wait_for_state(manager: &BluetoothManager, expected: AdapterState) {
    eventually(|| async { manager.current_state().await == expected }).await;
}

#[tokio::test]
async fn state_stream_replays_current_then_follows_enable() {
    let (sim, events) = SimulatedTransport::with_events();
    sim.set_enabled(false);
    let manager = BluetoothManager::new(sim.clone(), events, BridgeConfig::default())
        .await
        .unwrap();

    let mut states = manager.state_changes().await;
    manager.enable().await.unwrap();
    let seen: Vec<_> = states.by_ref().take(3).collect().await;
    assert_eq!(
        seen,
        vec![AdapterState::Off, AdapterState::Busy, AdapterState::Ready]
    );

    // A fresh subscription starts over from the current value.
    let mut again = manager.state_changes().await;
    assert_eq!(again.next().await, Some(AdapterState::Ready));
}

#[tokio::test]
async fn failed_enable_returns_to_off() {
    let (sim, events) = SimulatedTransport::with_events();
    sim.set_enabled(false);
    let manager = BluetoothManager::new(sim.clone(), events, BridgeConfig::default())
        .await
        .unwrap();
    sim.fail_next("enable", NativeFailure::new(error_codes::UNKNOWN, "radio jammed"));

    let err = manager.enable().await.unwrap_err();
    assert_eq!(
        err,
        BridgeError::TransportError {
            code: error_codes::UNKNOWN,
            message: "radio jammed".into()
        }
    );
    assert_eq!(manager.current_state().await, AdapterState::Off);
}

#[tokio::test]
async fn operations_on_a_powered_off_adapter_fail() {
    let (sim, events) = SimulatedTransport::with_events();
    sim.set_enabled(false);
    let manager = BluetoothManager::new(sim, events, BridgeConfig::default())
        .await
        .unwrap();

    assert_eq!(
        manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap_err(),
        BridgeError::AdapterOff
    );
    assert_eq!(
        manager.connect(FOO, SPP, SecurityMode::Secure).await.unwrap_err(),
        BridgeError::AdapterOff
    );
    // Disabling an adapter that is already off is a no-op.
    manager.disable().await.unwrap();
    assert_eq!(manager.current_state().await, AdapterState::Off);
}

#[tokio::test]
async fn natural_completion_reports_found_devices() {
    let (manager, sim) = setup().await;
    sim.add_device("Bar", "11:22:33:44:55:66", &[]);

    let handle = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();
    let summary = handle.finished().await.unwrap();

    let addresses: Vec<_> = summary.devices.iter().map(|d| d.address.as_str()).collect();
    assert_eq!(addresses, vec![FOO, "11:22:33:44:55:66"]);
    assert_eq!(manager.current_state().await, AdapterState::Ready);
}

#[tokio::test(start_paused = true)]
async fn silent_discovery_times_out_and_returns_to_ready() {
    let (manager, sim) = setup().await;
    sim.set_discovery_mode(DiscoveryMode::Silent);

    let handle = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();
    assert_eq!(manager.current_state().await, AdapterState::Busy);

    let started = tokio::time::Instant::now();
    assert_eq!(handle.finished().await, Err(BridgeError::DiscoveryTimeout));
    assert!(started.elapsed() >= Duration::from_millis(15_000));
    assert_eq!(manager.current_state().await, AdapterState::Ready);
    eventually(|| async { sim.call_count("stopDiscovery") == 1 }).await;
}

#[tokio::test]
async fn stop_before_timeout_cancels_with_one_device_recorded() {
    let (manager, sim) = setup().await;
    sim.set_discovery_mode(DiscoveryMode::Silent);
    let notified = Arc::new(Mutex::new(Vec::new()));
    let sink = notified.clone();

    let handle = manager
        .start_discovery(move |device: &BluetoothDevice| {
            sink.lock().unwrap().push(device.address.clone());
        })
        .await
        .unwrap();
    sim.announce("Foo", "aa:bb:cc:dd:ee:ff");
    sim.announce("Foo", FOO);
    eventually(|| async {
        let count = notified.lock().unwrap().len();
        count == 1 && !manager.devices().await.is_empty()
    })
    .await;

    let id = handle.id();
    manager.stop_discovery(id).await.unwrap();
    assert_eq!(handle.finished().await, Err(BridgeError::DiscoveryCancelled));
    assert_eq!(manager.current_state().await, AdapterState::Ready);
    assert_eq!(manager.devices().await.len(), 1);
    assert_eq!(*notified.lock().unwrap(), vec![FOO.to_string()]);

    assert_eq!(
        manager.stop_discovery(id).await,
        Err(BridgeError::NoActiveDiscovery)
    );
}

#[tokio::test]
async fn second_discovery_is_rejected_and_first_keeps_running() {
    let (manager, sim) = setup().await;
    sim.set_discovery_mode(DiscoveryMode::Silent);

    let first = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();
    assert_eq!(
        manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap_err(),
        BridgeError::DiscoveryAlreadyActive
    );
    assert!(manager.is_discovering().await);

    sim.finish_discovery();
    assert!(first.finished().await.is_ok());
    assert_eq!(manager.current_state().await, AdapterState::Ready);
}

#[tokio::test]
async fn late_finish_of_a_cancelled_session_does_not_end_the_next() {
    let (manager, sim) = setup().await;
    sim.set_discovery_mode(DiscoveryMode::Silent);

    let first = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();
    sim.announce("Foo", FOO);
    eventually(|| async { !manager.devices().await.is_empty() }).await;
    manager.stop_discovery(first.id()).await.unwrap();

    // Stopping makes the native layer report a finish for the first session.
    let second = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();
    sim.announce("Bar", "11:22:33:44:55:66");
    eventually(|| async { manager.devices().await.len() == 2 }).await;
    assert!(manager.is_discovering().await);
    assert_eq!(manager.current_state().await, AdapterState::Busy);

    sim.finish_discovery();
    let summary = second.finished().await.unwrap();
    assert_eq!(summary.devices.len(), 1);
    assert_eq!(summary.devices[0].name, "Bar");
}

#[tokio::test]
async fn discovery_start_failure_unwinds_busy() {
    let (manager, sim) = setup().await;
    sim.fail_next("startDiscovery", NativeFailure::new(error_codes::UNKNOWN, "scan failed"));

    assert!(matches!(
        manager.start_discovery(|_: &BluetoothDevice| {}).await,
        Err(BridgeError::TransportError { .. })
    ));
    assert_eq!(manager.current_state().await, AdapterState::Ready);
    assert!(!manager.is_discovering().await);
}

#[tokio::test]
async fn connect_while_connected_keeps_existing_connection() {
    let (manager, sim) = connected().await;
    sim.add_device("Bar", "11:22:33:44:55:66", &[SPP]);

    assert_eq!(
        manager
            .connect("11:22:33:44:55:66", SPP, SecurityMode::Insecure)
            .await
            .unwrap_err(),
        BridgeError::AlreadyConnected
    );
    let info = manager.connection().await.unwrap();
    assert_eq!(info.address, FOO);
    assert_eq!(info.security_mode, SecurityMode::Secure);
    assert_eq!(manager.current_state().await, AdapterState::Connected);
}

#[tokio::test]
async fn refused_connect_returns_to_ready() {
    let (manager, sim) = setup().await;
    sim.set_connect_behavior(ConnectBehavior::Refuse("read failed, socket might closed".into()));

    assert_eq!(
        manager.connect(FOO, SPP, SecurityMode::Secure).await.unwrap_err(),
        BridgeError::ConnectFailed {
            reason: "read failed, socket might closed".into()
        }
    );
    assert_eq!(manager.current_state().await, AdapterState::Ready);
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn malformed_connect_arguments_are_rejected_up_front() {
    let (manager, sim) = setup().await;
    assert!(matches!(
        manager.connect(FOO, "not-a-uuid", SecurityMode::Secure).await,
        Err(BridgeError::InvalidArgument(_))
    ));
    assert!(matches!(
        manager.connect("AA:BB", SPP, SecurityMode::Secure).await,
        Err(BridgeError::InvalidArgument(_))
    ));
    assert_eq!(sim.call_count("connect"), 0);
    assert_eq!(manager.current_state().await, AdapterState::Ready);
}

#[tokio::test]
async fn disconnect_cancels_an_attempt_in_flight() {
    let (manager, sim) = setup().await;
    sim.set_connect_behavior(ConnectBehavior::Stall);

    let attempt = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.connect(FOO, SPP, SecurityMode::Secure).await })
    };
    eventually(|| async { sim.call_count("connect") == 1 }).await;
    assert_eq!(manager.current_state().await, AdapterState::Busy);

    manager.disconnect().await.unwrap();
    assert_eq!(
        attempt.await.unwrap().unwrap_err(),
        BridgeError::ConnectFailed {
            reason: "connection attempt cancelled".into()
        }
    );
    assert_eq!(manager.current_state().await, AdapterState::Ready);
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn late_success_after_cancellation_is_discarded() {
    let (manager, sim) = setup().await;
    sim.set_connect_behavior(ConnectBehavior::Stall);

    let attempt = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.connect(FOO, SPP, SecurityMode::Secure).await })
    };
    eventually(|| async { sim.call_count("connect") == 1 }).await;

    // The native abort is lost, so the socket opens after all.
    sim.fail_next("disconnect", NativeFailure::new(error_codes::UNKNOWN, "busy"));
    manager.disconnect().await.unwrap();
    assert!(attempt.await.unwrap().is_err());

    sim.complete_stalled_connects();
    eventually(|| async { sim.call_count("disconnect") == 2 }).await;
    assert!(!sim.is_socket_open());
    assert!(!manager.is_connected().await);
    assert_eq!(manager.current_state().await, AdapterState::Ready);
}

#[tokio::test]
async fn disconnect_without_connection_is_a_no_op() {
    let (manager, sim) = setup().await;
    manager.disconnect().await.unwrap();
    manager.disconnect().await.unwrap();
    assert_eq!(sim.call_count("disconnect"), 0);
    assert_eq!(manager.current_state().await, AdapterState::Ready);
}

#[tokio::test]
async fn managed_connection_carries_data_both_ways() {
    let (manager, sim) = connected().await;
    assert_eq!(
        manager.write(WritePayload::text("early")).await,
        Err(BridgeError::NotManaged)
    );

    let mut inbound = manager.start_managed(|_| {}).await.unwrap();
    assert!(manager.is_connection_managed().await);
    assert_eq!(
        manager.start_managed(|_| {}).await.unwrap_err(),
        BridgeError::AlreadyManaged
    );

    sim.receive(b"ping");
    sim.receive(&[0xFF, 0x00]);
    assert_eq!(inbound.next().await, Some(b"ping".to_vec()));
    assert_eq!(inbound.next().await, Some(vec![0xFF, 0x00]));

    assert_eq!(manager.write(WritePayload::text("hello")).await, Ok(5));
    assert_eq!(
        manager
            .write(WritePayload::text_with("hi", TextEncoding::Utf16Le))
            .await,
        Ok(4)
    );
    assert_eq!(manager.write(WritePayload::Integer(1)).await, Ok(4));

    let written = sim.written();
    assert_eq!(written[0], "hello".as_bytes());
    assert_eq!(written[1], vec![b'h', 0, b'i', 0]);
    assert_eq!(written[2], vec![0, 0, 0, 1]);

    manager.stop_managed().await.unwrap();
    assert_eq!(inbound.next().await, None);
    assert_eq!(manager.stop_managed().await, Err(BridgeError::NotManaged));
    assert!(manager.is_connected().await);
}

#[tokio::test]
async fn default_text_encoding_matches_explicit_utf8() {
    let (manager, sim) = connected().await;
    let _inbound = manager.start_managed(|_| {}).await.unwrap();

    manager.write(WritePayload::text("hello")).await.unwrap();
    manager
        .write(WritePayload::text_with("hello", TextEncoding::Utf8))
        .await
        .unwrap();

    let written = sim.written();
    assert_eq!(written[0], written[1]);
}

#[tokio::test]
async fn connection_lost_fires_once_and_ends_managed_mode() {
    let (manager, sim) = connected().await;
    let fired = Arc::new(AtomicUsize::new(0));
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let (counter, sink) = (fired.clone(), reasons.clone());
    let mut inbound = manager
        .start_managed(move |reason| {
            counter.fetch_add(1, Ordering::SeqCst);
            sink.lock().unwrap().push(reason);
        })
        .await
        .unwrap();

    sim.lose_connection("Device connection was lost");
    sim.lose_connection("Device connection was lost");
    wait_for_state(&manager, AdapterState::Ready).await;

    assert_eq!(inbound.next().await, None);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(
        reasons.lock().unwrap()[0],
        BridgeError::ConnectionLost {
            reason: "Device connection was lost".into()
        }
    );
    assert_eq!(
        manager.write(WritePayload::text("hello")).await,
        Err(BridgeError::NotManaged)
    );
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn disable_while_connected_disconnects_first() {
    let (manager, sim) = connected().await;
    let mut states = manager.state_changes().await;

    manager.disable().await.unwrap();

    let seen: Vec<_> = states.by_ref().take(4).collect().await;
    assert_eq!(
        seen,
        vec![
            AdapterState::Connected,
            AdapterState::Ready,
            AdapterState::Busy,
            AdapterState::Off
        ]
    );
    assert_eq!(sim.call_count("disconnect"), 1);
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn adapter_loss_unwinds_everything_to_off() {
    let (manager, sim) = connected().await;
    let lost = Arc::new(Mutex::new(None));
    let sink = lost.clone();
    let mut inbound = manager
        .start_managed(move |reason| {
            *sink.lock().unwrap() = Some(reason);
        })
        .await
        .unwrap();

    sim.lose_adapter();
    wait_for_state(&manager, AdapterState::Off).await;

    assert_eq!(inbound.next().await, None);
    assert_eq!(*lost.lock().unwrap(), Some(BridgeError::AdapterLost));
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn pairing_completes_on_bond_event() {
    let (manager, _sim) = setup().await;

    let device = manager.pair("aa:bb:cc:dd:ee:ff").await.unwrap();
    assert_eq!(device.address, FOO);
    assert!(manager.is_paired(FOO).await.unwrap());

    let paired = manager.paired_devices().await.unwrap();
    assert_eq!(paired, vec![BluetoothDevice::new("Foo", FOO)]);

    assert!(matches!(
        manager.pair(FOO).await,
        Err(BridgeError::PairingFailed { .. })
    ));

    manager.unpair(FOO).await.unwrap();
    assert!(!manager.is_paired(FOO).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn unanswered_pairing_times_out() {
    let (manager, sim) = setup().await;
    sim.set_answer_requests(false);

    let err = manager.pair(FOO).await.unwrap_err();
    assert!(matches!(err, BridgeError::PairingFailed { .. }));

    // The slot is free again.
    sim.set_answer_requests(true);
    assert!(manager.pair(FOO).await.is_ok());
}

#[tokio::test]
async fn uuids_are_cached_until_rediscovery() {
    let (manager, sim) = setup().await;

    assert_eq!(manager.get_uuids(FOO).await.unwrap(), vec![SPP.to_string()]);
    assert_eq!(manager.get_uuids(FOO).await.unwrap(), vec![SPP.to_string()]);
    assert_eq!(sim.call_count("getUuids"), 1);

    let handle = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();
    handle.finished().await.unwrap();
    assert_eq!(manager.device(FOO).await.unwrap().unwrap().uuids, None);

    manager.get_uuids(FOO).await.unwrap();
    assert_eq!(sim.call_count("getUuids"), 2);
}

#[tokio::test(start_paused = true)]
async fn unanswered_uuid_fetch_times_out() {
    let (manager, sim) = setup().await;
    sim.set_answer_requests(false);

    assert!(matches!(
        manager.get_uuids(FOO).await,
        Err(BridgeError::UuidFetchFailed { .. })
    ));
}

#[tokio::test]
async fn shutdown_cancels_discovery_and_closes_connection() {
    let (manager, sim) = setup().await;
    sim.set_discovery_mode(DiscoveryMode::Silent);
    let handle = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();

    manager.shutdown().await;

    assert_eq!(handle.finished().await, Err(BridgeError::DiscoveryCancelled));
    assert_eq!(manager.current_state().await, AdapterState::Ready);
    assert_eq!(sim.call_count("stopDiscovery"), 1);
}

fn shut_down() -> BridgeError {
    BridgeError::TransportError {
        code: error_codes::UNKNOWN,
        message: "bridge shut down".into(),
    }
}

#[tokio::test]
async fn operations_after_shutdown_are_refused() {
    let (manager, sim) = setup().await;
    manager.shutdown().await;
    let calls = sim.calls().len();

    assert_eq!(manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap_err(), shut_down());
    assert_eq!(manager.connect(FOO, SPP, SecurityMode::Secure).await.unwrap_err(), shut_down());
    assert_eq!(manager.pair(FOO).await.unwrap_err(), shut_down());
    assert_eq!(manager.get_uuids(FOO).await.unwrap_err(), shut_down());
    assert_eq!(manager.disable().await.unwrap_err(), shut_down());
    assert_eq!(sim.calls().len(), calls);
    assert_eq!(manager.current_state().await, AdapterState::Ready);

    // Cancellations stay harmless.
    manager.disconnect().await.unwrap();
}

#[tokio::test]
async fn operations_during_discovery_are_rejected_as_busy() {
    let (manager, sim) = setup().await;
    sim.set_discovery_mode(DiscoveryMode::Silent);
    let handle = manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap();
    let session = handle.id();

    assert_eq!(
        manager.connect(FOO, SPP, SecurityMode::Secure).await.unwrap_err(),
        BridgeError::AdapterBusy
    );
    assert_eq!(manager.disable().await.unwrap_err(), BridgeError::AdapterBusy);
    assert_eq!(manager.enable().await.unwrap_err(), BridgeError::AdapterBusy);
    assert_eq!(manager.pair(FOO).await.unwrap_err(), BridgeError::AdapterBusy);
    assert_eq!(manager.get_uuids(FOO).await.unwrap_err(), BridgeError::AdapterBusy);

    assert_eq!(sim.call_count("connect"), 0);
    assert_eq!(sim.call_count("pair"), 0);
    assert!(manager.is_discovering().await);
    assert_eq!(manager.current_state().await, AdapterState::Busy);

    manager.stop_discovery(session).await.unwrap();
    assert_eq!(handle.finished().await, Err(BridgeError::DiscoveryCancelled));
    assert_eq!(manager.current_state().await, AdapterState::Ready);
}

#[tokio::test]
async fn discovery_cannot_start_while_a_connect_is_in_flight() {
    let (manager, sim) = setup().await;
    sim.set_connect_behavior(ConnectBehavior::Stall);

    let attempt = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.connect(FOO, SPP, SecurityMode::Secure).await })
    };
    eventually(|| async { sim.call_count("connect") == 1 }).await;

    assert_eq!(
        manager.start_discovery(|_: &BluetoothDevice| {}).await.unwrap_err(),
        BridgeError::AdapterBusy
    );
    assert!(!manager.is_discovering().await);
    assert_eq!(sim.call_count("startDiscovery"), 0);

    manager.disconnect().await.unwrap();
    assert!(attempt.await.unwrap().is_err());
    assert_eq!(manager.current_state().await, AdapterState::Ready);
}

/// Powers the radio on only after a delay.
struct SlowPowerOn {
    inner: Arc<SimulatedTransport>,
    delay: Duration,
}

#[async_trait::async_trait]
impl NativeTransport for SlowPowerOn {
    async fn call(&self, command: NativeCommand) -> Result<Value, NativeFailure> {
        if matches!(command, NativeCommand::Enable) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.call(command).await
    }
}

#[tokio::test(start_paused = true)]
async fn abandoned_enable_still_settles_the_adapter() {
    let (sim, events) = SimulatedTransport::with_events();
    sim.set_enabled(false);
    let transport = Arc::new(SlowPowerOn {
        inner: sim,
        delay: Duration::from_millis(200),
    });
    let manager = BluetoothManager::new(transport, events, BridgeConfig::default())
        .await
        .unwrap();

    assert!(timeout(Duration::from_millis(50), manager.enable()).await.is_err());
    assert_eq!(manager.current_state().await, AdapterState::Busy);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(manager.current_state().await, AdapterState::Ready);
    manager.enable().await.unwrap();
    manager.disable().await.unwrap();
    assert_eq!(manager.current_state().await, AdapterState::Off);
}

#[tokio::test(start_paused = true)]
async fn abandoned_pairing_frees_its_slot() {
    let (manager, sim) = setup().await;
    sim.set_answer_requests(false);

    assert!(timeout(Duration::from_millis(50), manager.pair(FOO)).await.is_err());
    tokio::time::sleep(Duration::from_millis(10)).await;

    sim.set_answer_requests(true);
    let device = manager.pair(FOO).await.unwrap();
    assert_eq!(device.address, FOO);
}

#[tokio::test(start_paused = true)]
async fn abandoned_uuid_fetch_frees_its_slot() {
    let (manager, sim) = setup().await;
    sim.set_answer_requests(false);

    assert!(timeout(Duration::from_millis(50), manager.get_uuids(FOO)).await.is_err());
    tokio::time::sleep(Duration::from_millis(10)).await;

    sim.set_answer_requests(true);
    assert_eq!(manager.get_uuids(FOO).await.unwrap(), vec![SPP.to_string()]);
}

#[tokio::test]
async fn abandoned_connect_is_cancelled() {
    let (manager, sim) = setup().await;
    sim.set_connect_behavior(ConnectBehavior::Stall);

    let attempt = manager.connect(FOO, SPP, SecurityMode::Secure);
    assert!(timeout(Duration::from_millis(50), attempt).await.is_err());

    wait_for_state(&manager, AdapterState::Ready).await;
    eventually(|| async { sim.call_count("disconnect") == 1 }).await;
    assert!(!manager.is_connected().await);

    sim.set_connect_behavior(ConnectBehavior::Accept);
    manager.connect(FOO, SPP, SecurityMode::Secure).await.unwrap();
    assert_eq!(manager.current_state().await, AdapterState::Connected);
}

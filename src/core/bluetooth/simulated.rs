//! In-process native Bluetooth layer
//!
//! Answers native calls from a scripted device table and pushes the events a
//! real platform would push. Used by the integration tests and the headless
//! demo; tests can also inject events directly to drive edge cases.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::core::bluetooth::constants::error_codes;
use crate::core::bluetooth::transport::{
    EventReceiver, EventSender, NativeCommand, NativeEvent, NativeFailure, NativeTransport,
    event_channel,
};

/// How `startDiscovery` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Acknowledge the start and stay quiet; the test drives everything else.
    Silent,
    /// Report every known device but never finish.
    Announce,
    /// Report every known device, then finish.
    Complete,
}

/// How `connect` behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectBehavior {
    Accept,
    Refuse(String),
    /// Never answers until `disconnect` aborts it or the test releases it.
    Stall,
}

#[derive(Debug, Clone)]
struct SimDevice {
    name: String,
    address: String,
    uuids: Vec<String>,
    bonded: bool,
}

struct SimState {
    enabled: bool,
    discovering: bool,
    connected: bool,
    managed: bool,
    discovery_mode: DiscoveryMode,
    /// Whether pair/getUuids are followed by their completion event
    answer_requests: bool,
    connect: ConnectBehavior,
    devices: Vec<SimDevice>,
    failures: HashMap<&'static str, NativeFailure>,
    stalled: Vec<oneshot::Sender<Result<Value, NativeFailure>>>,
    calls: Vec<NativeCommand>,
    written: Vec<Vec<u8>>,
}

pub struct SimulatedTransport {
    state: Mutex<SimState>,
    events: EventSender,
}

impl SimulatedTransport {
    /// A powered-on adapter with no devices in range, plus the receiving end
    /// of its unsolicited events.
    pub fn with_events() -> (Arc<Self>, EventReceiver) {
        let (events, rx) = event_channel();
        let transport = Arc::new(Self {
            state: Mutex::new(SimState {
                enabled: true,
                discovering: false,
                connected: false,
                managed: false,
                discovery_mode: DiscoveryMode::Complete,
                answer_requests: true,
                connect: ConnectBehavior::Accept,
                devices: Vec::new(),
                failures: HashMap::new(),
                stalled: Vec::new(),
                calls: Vec::new(),
                written: Vec::new(),
            }),
            events,
        });
        (transport, rx)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_device(&self, name: &str, address: &str, uuids: &[&str]) {
        self.lock().devices.push(SimDevice {
            name: name.to_string(),
            address: address.to_string(),
            uuids: uuids.iter().map(|uuid| uuid.to_string()).collect(),
            bonded: false,
        });
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    pub fn set_discovery_mode(&self, mode: DiscoveryMode) {
        self.lock().discovery_mode = mode;
    }

    /// When off, pair and getUuids are accepted but never completed.
    pub fn set_answer_requests(&self, answer: bool) {
        self.lock().answer_requests = answer;
    }

    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        self.lock().connect = behavior;
    }

    /// The next call of `action` fails with `failure`.
    pub fn fail_next(&self, action: &'static str, failure: NativeFailure) {
        self.lock().failures.insert(action, failure);
    }

    pub fn emit(&self, event: NativeEvent) {
        debug!("Simulated event: {:?}", event);
        // Nobody listening once the manager is gone.
        let _ = self.events.send(event);
    }

    pub fn announce(&self, name: &str, address: &str) {
        self.emit(NativeEvent::DeviceFound {
            name: name.to_string(),
            address: address.to_string(),
        });
    }

    pub fn finish_discovery(&self) {
        self.lock().discovering = false;
        self.emit(NativeEvent::DiscoveryFinished);
    }

    pub fn receive(&self, bytes: &[u8]) {
        self.emit(NativeEvent::DataRead {
            bytes: bytes.to_vec(),
        });
    }

    pub fn lose_connection(&self, message: &str) {
        {
            let mut sim = self.lock();
            sim.connected = false;
            sim.managed = false;
        }
        self.emit(NativeEvent::ConnectionLost {
            message: message.to_string(),
        });
    }

    pub fn lose_adapter(&self) {
        {
            let mut sim = self.lock();
            sim.enabled = false;
            sim.discovering = false;
            sim.connected = false;
            sim.managed = false;
        }
        self.emit(NativeEvent::AdapterLost);
    }

    /// Lets every stalled connect succeed.
    pub fn complete_stalled_connects(&self) {
        let mut sim = self.lock();
        let stalled: Vec<_> = sim.stalled.drain(..).collect();
        if !stalled.is_empty() {
            sim.connected = true;
        }
        for reply in stalled {
            let _ = reply.send(Ok(Value::Null));
        }
    }

    pub fn calls(&self) -> Vec<NativeCommand> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, action: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|command| command.action() == action)
            .count()
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    pub fn is_socket_open(&self) -> bool {
        self.lock().connected
    }

    fn device_mut<'a>(sim: &'a mut SimState, address: &str) -> Result<&'a mut SimDevice, NativeFailure> {
        sim.devices
            .iter_mut()
            .find(|device| device.address.eq_ignore_ascii_case(address))
            .ok_or_else(|| NativeFailure::new(error_codes::UNKNOWN, format!("no device at {address}")))
    }

    fn require_enabled(sim: &SimState) -> Result<(), NativeFailure> {
        if sim.enabled {
            Ok(())
        } else {
            Err(NativeFailure::new(error_codes::UNKNOWN, "Bluetooth is not enabled"))
        }
    }

    fn require_socket(sim: &SimState) -> Result<(), NativeFailure> {
        if sim.connected {
            Ok(())
        } else {
            Err(NativeFailure::new(
                error_codes::CONNECTION_DOESNT_EXIST,
                "There is no connection",
            ))
        }
    }

    /// Answers one command. Events are collected and emitted after the lock is released.
    fn answer(
        sim: &mut SimState,
        command: NativeCommand,
        events: &mut Vec<NativeEvent>,
    ) -> Result<Value, NativeFailure> {
        match command {
            NativeCommand::IsEnabled => Ok(json!(sim.enabled)),
            NativeCommand::Enable => {
                sim.enabled = true;
                Ok(Value::Null)
            }
            NativeCommand::Disable => {
                sim.enabled = false;
                sim.discovering = false;
                sim.connected = false;
                sim.managed = false;
                Ok(Value::Null)
            }
            NativeCommand::IsDiscovering => Ok(json!(sim.discovering)),
            NativeCommand::StartDiscovery => {
                Self::require_enabled(sim)?;
                sim.discovering = true;
                events.push(NativeEvent::DiscoveryStarted);
                if sim.discovery_mode != DiscoveryMode::Silent {
                    events.extend(sim.devices.iter().map(|device| NativeEvent::DeviceFound {
                        name: device.name.clone(),
                        address: device.address.clone(),
                    }));
                }
                if sim.discovery_mode == DiscoveryMode::Complete {
                    sim.discovering = false;
                    events.push(NativeEvent::DiscoveryFinished);
                }
                Ok(Value::Null)
            }
            NativeCommand::StopDiscovery => {
                if sim.discovering {
                    sim.discovering = false;
                    events.push(NativeEvent::DiscoveryFinished);
                }
                Ok(Value::Null)
            }
            NativeCommand::IsPaired { address } => {
                Ok(json!(Self::device_mut(sim, &address)?.bonded))
            }
            NativeCommand::Pair { address } => {
                Self::require_enabled(sim)?;
                let answer = sim.answer_requests;
                let device = Self::device_mut(sim, &address)?;
                if device.bonded {
                    return Err(NativeFailure::new(
                        error_codes::UNKNOWN,
                        "The device is already paired.",
                    ));
                }
                if !answer {
                    return Ok(Value::Null);
                }
                device.bonded = true;
                events.push(NativeEvent::DeviceBonded {
                    name: device.name.clone(),
                    address: device.address.clone(),
                });
                Ok(Value::Null)
            }
            NativeCommand::Unpair { address } => {
                let device = Self::device_mut(sim, &address)?;
                if !device.bonded {
                    return Err(NativeFailure::new(
                        error_codes::UNKNOWN,
                        "Device at given address is not bonded.",
                    ));
                }
                device.bonded = false;
                Ok(Value::Null)
            }
            NativeCommand::GetPaired => Ok(Value::Array(
                sim.devices
                    .iter()
                    .filter(|device| device.bonded)
                    .map(|device| json!({ "name": device.name, "address": device.address }))
                    .collect(),
            )),
            NativeCommand::GetUuids { address } => {
                Self::require_enabled(sim)?;
                let answer = sim.answer_requests;
                let device = Self::device_mut(sim, &address)?;
                if !answer {
                    return Ok(Value::Null);
                }
                events.push(NativeEvent::UuidsFound {
                    name: device.name.clone(),
                    address: device.address.clone(),
                    uuids: device.uuids.clone(),
                });
                Ok(Value::Null)
            }
            NativeCommand::Connect { address, .. } => {
                Self::require_enabled(sim)?;
                match sim.connect.clone() {
                    ConnectBehavior::Accept => {
                        Self::device_mut(sim, &address).map_err(|failure| {
                            NativeFailure::new(error_codes::CONNECTING_FAILED, failure.message)
                        })?;
                        sim.connected = true;
                        Ok(Value::Null)
                    }
                    ConnectBehavior::Refuse(reason) => {
                        Err(NativeFailure::new(error_codes::CONNECTING_FAILED, reason))
                    }
                    // Handled before the state is borrowed.
                    ConnectBehavior::Stall => Err(NativeFailure::new(
                        error_codes::UNKNOWN,
                        "stalled connect answered synchronously",
                    )),
                }
            }
            NativeCommand::Disconnect => {
                sim.connected = false;
                sim.managed = false;
                for reply in sim.stalled.drain(..) {
                    let _ = reply.send(Err(NativeFailure::new(
                        error_codes::CONNECTING_FAILED,
                        "socket closed",
                    )));
                }
                Ok(Value::Null)
            }
            NativeCommand::StartConnectionManager => {
                Self::require_socket(sim)?;
                sim.managed = true;
                Ok(Value::Null)
            }
            NativeCommand::StopConnectionManager => {
                sim.managed = false;
                Ok(Value::Null)
            }
            NativeCommand::Write { bytes } => {
                Self::require_socket(sim)?;
                let written = bytes.len();
                sim.written.push(bytes);
                Ok(json!(written))
            }
        }
    }
}

#[async_trait]
impl NativeTransport for SimulatedTransport {
    async fn call(&self, command: NativeCommand) -> Result<Value, NativeFailure> {
        let mut events = Vec::new();
        let stalled = {
            let mut sim = self.lock();
            sim.calls.push(command.clone());
            if let Some(failure) = sim.failures.remove(command.action()) {
                return Err(failure);
            }
            if matches!(command, NativeCommand::Connect { .. })
                && sim.connect == ConnectBehavior::Stall
            {
                let (reply, rx) = oneshot::channel();
                sim.stalled.push(reply);
                Some(rx)
            } else {
                None
            }
        };
        if let Some(rx) = stalled {
            return rx.await.unwrap_or_else(|_| {
                Err(NativeFailure::new(error_codes::CONNECTING_FAILED, "socket closed"))
            });
        }

        let result = {
            let mut sim = self.lock();
            Self::answer(&mut sim, command, &mut events)
        };
        for event in events {
            self.emit(event);
        }
        result
    }
}

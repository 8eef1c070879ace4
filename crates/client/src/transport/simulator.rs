//! In-process simulated device
//!
//! The simulator decodes what the client writes and answers the way a menu
//! device would: it joins back, bootstraps its scripted items, acknowledges
//! changes and echoes heartbeats. Tests drive it further through
//! [`SimulatorTransport::inject`] and [`SimulatorTransport::drop_connection`].

use super::{EventSender, Transport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use embedctl_core::error::{ConfigError, EmbedError, Result};
use embedctl_core::menu::{
    AnalogInfo, BooleanNaming, EditItemType, MenuItem, MenuItemBuilder, MenuValue, ROOT_ID,
};
use embedctl_core::protocol::{
    API_VERSION, AckStatus, CorrelationId, FrameDecoder, HeartbeatMode, MenuCommand, encode,
};
use embedctl_core::remote::ApiPlatform;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// One item the simulated device bootstraps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedItem {
    #[serde(default)]
    pub parent_id: u16,
    pub item: MenuItem,
    pub value: MenuValue,
}

/// Behaviour of the simulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorScript {
    pub device_name: String,
    pub device_uuid: Uuid,
    pub platform: ApiPlatform,
    pub serial_number: u64,
    /// Reject the client's Join with `InvalidCredentials` when false
    pub accept_auth: bool,
    pub accept_pairing: bool,
    pub echo_heartbeats: bool,
    pub heartbeat_interval_ms: u32,
    /// Send `Bootstrap{Start}` before the items
    pub announce_bootstrap: bool,
    /// Answer change requests at all
    pub ack_changes: bool,
    /// Status sent back for every change request
    pub change_status: AckStatus,
    /// Split outgoing frames into chunks of this size
    pub chunk_size: Option<usize>,
    pub items: Vec<SimulatedItem>,
}

impl Default for SimulatorScript {
    fn default() -> Self {
        Self {
            device_name: "Simulated Device".to_string(),
            device_uuid: Uuid::from_u128(0x5e1a_7ed0_0000_4000_8000_0000_0000_0001),
            platform: ApiPlatform::Arduino32,
            serial_number: 1_000_001,
            accept_auth: true,
            accept_pairing: true,
            echo_heartbeats: true,
            heartbeat_interval_ms: 1500,
            announce_bootstrap: true,
            ack_changes: true,
            change_status: AckStatus::Success,
            chunk_size: None,
            items: Vec::new(),
        }
    }
}

impl SimulatorScript {
    /// Load a script from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EmbedError::Config(ConfigError::FileError {
                reason: format!("Failed to read simulator script {}: {e}", path.display()),
            })
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            EmbedError::Config(ConfigError::FileError {
                reason: format!("Failed to parse simulator script {}: {e}", path.display()),
            })
        })
    }

    pub fn with_item(mut self, parent_id: u16, item: MenuItem, value: MenuValue) -> Self {
        self.items.push(SimulatedItem {
            parent_id,
            item,
            value,
        });
        self
    }

    /// Small menu used by `--simulate`
    pub fn demo() -> Self {
        Self::default()
            .with_item(
                ROOT_ID,
                MenuItemBuilder::analog(
                    1,
                    "Volume",
                    AnalogInfo {
                        max: 255,
                        offset: -180,
                        divisor: 2,
                        unit: "dB".to_string(),
                    },
                )
                .eeprom(2)
                .build(),
                MenuValue::Int(120),
            )
            .with_item(
                ROOT_ID,
                MenuItemBuilder::enumeration(2, "Channel", ["CD", "DVD", "Turntable"]).build(),
                MenuValue::Int(0),
            )
            .with_item(
                ROOT_ID,
                MenuItemBuilder::boolean(3, "Mute", BooleanNaming::OnOff).build(),
                MenuValue::Bool(false),
            )
            .with_item(ROOT_ID, MenuItemBuilder::sub_menu(4, "Settings").build(), MenuValue::Bool(false))
            .with_item(
                4,
                MenuItemBuilder::text(5, "Zone", 10, EditItemType::PlainText).build(),
                MenuValue::Text("Lounge".to_string()),
            )
            .with_item(
                4,
                MenuItemBuilder::float(6, "Temp", 1).read_only(true).build(),
                MenuValue::Float(21.5),
            )
            .with_item(4, MenuItemBuilder::action(7, "Save").build(), MenuValue::Bool(false))
    }
}

#[derive(Default)]
struct SimulatorState {
    events: Option<EventSender>,
    decoder: FrameDecoder,
    received: Vec<MenuCommand>,
    connects: usize,
}

/// Transport backed by an in-process simulated device
pub struct SimulatorTransport {
    script: Mutex<SimulatorScript>,
    state: Mutex<SimulatorState>,
}

impl std::fmt::Debug for SimulatorTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatorTransport")
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatorTransport {
    pub fn new(script: SimulatorScript) -> Self {
        Self {
            script: Mutex::new(script),
            state: Mutex::new(SimulatorState::default()),
        }
    }

    /// Change the device behaviour, takes effect for the next message
    pub fn set_script(&self, script: SimulatorScript) {
        *lock(&self.script) = script;
    }

    /// Everything the client has sent, in order
    pub fn received(&self) -> Vec<MenuCommand> {
        lock(&self.state).received.clone()
    }

    pub fn clear_received(&self) {
        lock(&self.state).received.clear();
    }

    /// How many times the client opened this transport
    pub fn connect_count(&self) -> usize {
        lock(&self.state).connects
    }

    /// Send a command from the device to the client
    pub fn inject(&self, command: &MenuCommand) -> Result<()> {
        let frame = encode(command)?;
        let chunk_size = lock(&self.script).chunk_size;
        let state = lock(&self.state);
        let events = state
            .events
            .as_ref()
            .ok_or_else(|| EmbedError::not_connected("simulator"))?;
        deliver(events, frame, chunk_size)
    }

    /// Push raw bytes to the client, for corrupt input tests
    pub fn inject_raw(&self, data: &[u8]) -> Result<()> {
        let state = lock(&self.state);
        let events = state
            .events
            .as_ref()
            .ok_or_else(|| EmbedError::not_connected("simulator"))?;
        deliver(events, Bytes::copy_from_slice(data), None)
    }

    /// Simulate the device going away
    pub fn drop_connection(&self) {
        let mut state = lock(&self.state);
        if let Some(events) = state.events.take() {
            let _ = events.send(TransportEvent::Closed("simulated connection drop".to_string()));
        }
        state.decoder.clear();
    }

    fn respond(&self, command: &MenuCommand) -> Vec<MenuCommand> {
        let script = lock(&self.script);
        match command {
            MenuCommand::Join { name, .. } => {
                debug!("Simulator received join from {}", name);
                let mut replies = vec![MenuCommand::Join {
                    name: script.device_name.clone(),
                    uuid: script.device_uuid,
                    api_version: API_VERSION,
                    platform: script.platform,
                    serial_number: script.serial_number,
                }];
                if !script.accept_auth {
                    replies.push(MenuCommand::Ack {
                        correlation: CorrelationId::NONE,
                        status: AckStatus::InvalidCredentials,
                    });
                    return replies;
                }
                if script.announce_bootstrap {
                    replies.push(MenuCommand::bootstrap_start());
                }
                replies.extend(script.items.iter().map(|entry| {
                    MenuCommand::item_boot(entry.parent_id, entry.item.clone(), entry.value.clone())
                }));
                replies.push(MenuCommand::bootstrap_complete());
                replies
            }
            MenuCommand::Heartbeat { mode, .. } if *mode != HeartbeatMode::End => {
                if script.echo_heartbeats {
                    vec![MenuCommand::Heartbeat {
                        interval_ms: script.heartbeat_interval_ms,
                        mode: HeartbeatMode::Normal,
                    }]
                } else {
                    Vec::new()
                }
            }
            MenuCommand::Change {
                correlation,
                item_id,
                ..
            } => {
                if !script.ack_changes {
                    return Vec::new();
                }
                let known = script.items.iter().any(|entry| entry.item.id == *item_id);
                vec![MenuCommand::Ack {
                    correlation: *correlation,
                    status: if known {
                        script.change_status
                    } else {
                        AckStatus::IdNotFound
                    },
                }]
            }
            MenuCommand::PairingRequest { .. } => vec![MenuCommand::PairingResponse {
                accepted: script.accept_pairing,
            }],
            _ => Vec::new(),
        }
    }
}

fn deliver(events: &EventSender, frame: Bytes, chunk_size: Option<usize>) -> Result<()> {
    let chunks: Vec<Bytes> = match chunk_size {
        Some(size) if size > 0 => frame.chunks(size).map(Bytes::copy_from_slice).collect(),
        _ => vec![frame],
    };
    for chunk in chunks {
        events
            .send(TransportEvent::Data(chunk))
            .map_err(|_| EmbedError::not_connected("simulator"))?;
    }
    Ok(())
}

#[async_trait]
impl Transport for SimulatorTransport {
    async fn connect(&self, events: EventSender) -> Result<()> {
        let mut state = lock(&self.state);
        if state.events.is_none() {
            state.events = Some(events);
            state.decoder.clear();
            state.connects += 1;
            debug!("Simulator connected");
        }
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = lock(&self.state);
        state.events = None;
        state.decoder.clear();
    }

    async fn write(&self, data: Bytes) -> Result<()> {
        let commands = {
            let mut state = lock(&self.state);
            if state.events.is_none() {
                return Err(EmbedError::not_connected(self.name()));
            }
            let mut commands = Vec::new();
            for result in state.decoder.decode(&data) {
                match result {
                    Ok(command) => commands.push(command),
                    Err(e) => warn!("Simulator discarded bad frame: {}", e),
                }
            }
            state.received.extend(commands.iter().cloned());
            commands
        };

        for command in &commands {
            for reply in self.respond(command) {
                self.inject(&reply)?;
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).events.is_some()
    }

    fn name(&self) -> &'static str {
        "simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedctl_core::protocol::{BootPhase, ChangeData};
    use tokio::sync::mpsc;

    fn join() -> MenuCommand {
        MenuCommand::Join {
            name: "tester".to_string(),
            uuid: Uuid::nil(),
            api_version: API_VERSION,
            platform: ApiPlatform::RemoteApi,
            serial_number: 0,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<MenuCommand> {
        let mut decoder = FrameDecoder::new();
        let mut commands = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let TransportEvent::Data(data) = event {
                commands.extend(decoder.decode(&data).into_iter().map(|r| r.unwrap()));
            }
        }
        commands
    }

    #[tokio::test]
    async fn test_join_triggers_bootstrap() {
        let sim = SimulatorTransport::new(SimulatorScript::demo());
        let (tx, mut rx) = mpsc::unbounded_channel();
        sim.connect(tx).await.unwrap();
        sim.write(encode(&join()).unwrap()).await.unwrap();

        let replies = drain(&mut rx);
        assert!(matches!(replies[0], MenuCommand::Join { .. }));
        assert_eq!(replies[1], MenuCommand::bootstrap_start());
        assert_eq!(replies.last(), Some(&MenuCommand::bootstrap_complete()));
        assert_eq!(replies.len(), 2 + SimulatorScript::demo().items.len() + 1);
        assert_eq!(sim.received(), vec![join()]);
    }

    #[tokio::test]
    async fn test_rejected_auth() {
        let script = SimulatorScript {
            accept_auth: false,
            ..SimulatorScript::default()
        };
        let sim = SimulatorTransport::new(script);
        let (tx, mut rx) = mpsc::unbounded_channel();
        sim.connect(tx).await.unwrap();
        sim.write(encode(&join()).unwrap()).await.unwrap();

        let replies = drain(&mut rx);
        assert_eq!(
            replies[1],
            MenuCommand::Ack {
                correlation: CorrelationId::NONE,
                status: AckStatus::InvalidCredentials
            }
        );
        assert!(!replies.iter().any(|c| matches!(
            c,
            MenuCommand::Bootstrap {
                phase: BootPhase::Start
            }
        )));
    }

    #[tokio::test]
    async fn test_change_is_acknowledged_in_chunks() {
        let script = SimulatorScript {
            chunk_size: Some(3),
            ..SimulatorScript::demo()
        };
        let sim = SimulatorTransport::new(script);
        let (tx, mut rx) = mpsc::unbounded_channel();
        sim.connect(tx).await.unwrap();

        let change = MenuCommand::Change {
            correlation: CorrelationId(77),
            item_id: 1,
            change: ChangeData::Absolute("42".to_string()),
        };
        sim.write(encode(&change).unwrap()).await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![MenuCommand::Ack {
                correlation: CorrelationId(77),
                status: AckStatus::Success
            }]
        );
    }

    #[tokio::test]
    async fn test_drop_connection_reports_closed() {
        let sim = SimulatorTransport::new(SimulatorScript::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        sim.connect(tx).await.unwrap();
        sim.drop_connection();

        assert!(matches!(rx.try_recv(), Ok(TransportEvent::Closed(_))));
        assert!(!sim.is_connected());
        assert!(sim.inject(&MenuCommand::bootstrap_start()).is_err());
    }

    #[test]
    fn test_script_json_round_trip() {
        let script = SimulatorScript::demo();
        let json = serde_json::to_string(&script).unwrap();
        let back: SimulatorScript = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);

        let minimal: SimulatorScript = serde_json::from_str(r#"{"device_name": "Bench"}"#).unwrap();
        assert_eq!(minimal.device_name, "Bench");
        assert!(minimal.accept_auth);
    }
}

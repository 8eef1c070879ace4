//! Helpers shared by the controller integration tests

use embedctl_client::RemoteControllerListener;
use embedctl_core::config::ControllerConfig;
use embedctl_core::menu::MenuItem;
use embedctl_core::protocol::{AckStatus, CorrelationId, DialogCommand};
use embedctl_core::remote::{AuthStatus, LocalIdentity, RemoteInformation};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// What a [`RecordingListener`] saw, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    State(AuthStatus),
    ItemChanged { id: u16, value_only: bool },
    TreePopulated,
    Ack {
        correlation: CorrelationId,
        item: Option<u16>,
        status: AckStatus,
    },
    Dialog(DialogCommand),
    UuidMismatch { expected: Uuid, actual: Uuid },
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    pub fn states(&self) -> Vec<AuthStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::State(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl RemoteControllerListener for RecordingListener {
    fn connection_state(&self, _remote: &RemoteInformation, status: AuthStatus) {
        self.push(Event::State(status));
    }

    fn menu_item_changed(&self, item: &MenuItem, value_only: bool) {
        self.push(Event::ItemChanged {
            id: item.id,
            value_only,
        });
    }

    fn tree_fully_populated(&self) {
        self.push(Event::TreePopulated);
    }

    fn ack_received(&self, correlation: CorrelationId, item: Option<&MenuItem>, status: AckStatus) {
        self.push(Event::Ack {
            correlation,
            item: item.map(|i| i.id),
            status,
        });
    }

    fn dialog_update(&self, dialog: &DialogCommand) {
        self.push(Event::Dialog(dialog.clone()));
    }

    fn remote_uuid_mismatch(&self, expected: Uuid, actual: Uuid) {
        self.push(Event::UuidMismatch { expected, actual });
    }
}

/// Timings short enough for tests
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        heartbeat_interval_ms: 50,
        heartbeat_timeout_ms: 300,
        connect_timeout_ms: 1000,
        ack_timeout_ms: 1000,
        reconnect_initial_ms: 50,
        reconnect_max_ms: 200,
        ..ControllerConfig::default()
    }
}

pub fn identity() -> LocalIdentity {
    LocalIdentity::new("integration", Uuid::from_u128(0x1234))
}

pub const WAIT: Duration = Duration::from_secs(3);

/// Poll `condition` until it holds or `limit` passes
pub async fn eventually(condition: impl Fn() -> bool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

//! # Remote Controller
//!
//! Drives one connection to a menu device: the handshake, the bootstrap of
//! the menu tree, heartbeats, value changes and reconnection.
//!
//! ## Architecture
//!
//! ```text
//! RemoteController (handle, Clone)
//!        │  Message queue (unbounded, single consumer)
//!        ▼
//! ControllerActor ──owns──▶ MenuTreeSynchronizer, CorrelationTracker, FrameDecoder
//!        ▲
//!        │  Connected / Transport / Tick / ReconnectDue, tagged with the epoch
//! link task, heartbeat ticker, reconnect timer
//! ```
//!
//! Every piece of controller state lives on the actor task, so tree updates
//! and listener callbacks happen strictly in message order. Background tasks
//! never touch that state; they post messages tagged with the connection
//! epoch they were started for. Each new connection attempt bumps the epoch,
//! which makes anything still in flight from an older attempt harmless.
//!
//! ## Connection lifecycle
//!
//! ```text
//! NotStarted ─start─▶ AwaitingConnection ─connected─▶ EstablishingConnection
//!     ─device join─▶ Authenticating ─bootstrap start─▶ Bootstrapping
//!     ─bootstrap complete─▶ ConnectionReady
//! ```
//!
//! A closed link, a write error, device silence or a heartbeat end moves to
//! `ConnectionFailed` and arms the reconnect timer. A credentials rejection
//! moves to `FailedAuth`, which stays put until `start` is called again,
//! usually after [`pair_with_device`](crate::pairing::pair_with_device).

mod listener;

pub use listener::RemoteControllerListener;

use crate::sync::{MenuTreeSynchronizer, TreeEvent};
use crate::tracker::CorrelationTracker;
use crate::transport::{Transport, TransportEvent, send_command};
use embedctl_core::config::ControllerConfig;
use embedctl_core::error::retry::ReconnectPolicy;
use embedctl_core::error::{AuthError, ConnectionError, EmbedError, Result, TimeoutError};
use embedctl_core::menu::{MenuTree, MenuValue, ROOT_ID};
use embedctl_core::protocol::{
    API_VERSION, AckStatus, BootPhase, ChangeData, CorrelationId, DialogButton, DialogCommand,
    DialogMode, FrameDecoder, HeartbeatMode, MenuCommand,
};
use embedctl_core::remote::{ApiPlatform, AuthStatus, LocalIdentity, RemoteInformation};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

enum Message {
    Start,
    Stop {
        done: oneshot::Sender<()>,
    },
    Shutdown,
    AddListener(Arc<dyn RemoteControllerListener>),
    SendChange {
        item_id: u16,
        change: ChangeData,
        reply: oneshot::Sender<Result<CorrelationId>>,
    },
    DialogAction {
        button: DialogButton,
        reply: oneshot::Sender<Result<CorrelationId>>,
    },
    RequestNames {
        locale: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot(oneshot::Sender<MenuTree>),
    ValueOf {
        id: u16,
        reply: oneshot::Sender<Option<MenuValue>>,
    },
    Connected {
        epoch: u64,
    },
    ConnectFailed {
        epoch: u64,
        error: EmbedError,
    },
    Transport {
        epoch: u64,
        event: TransportEvent,
    },
    Tick {
        epoch: u64,
    },
    ReconnectDue {
        epoch: u64,
    },
}

/// Tells the actor to finish once the last handle is gone
struct ShutdownGuard {
    tx: mpsc::UnboundedSender<Message>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// Handle to a remote menu device connection
///
/// Cheap to clone; all clones drive the same controller. The controller task
/// ends when [`shutdown`](Self::shutdown) is called or the last clone is
/// dropped.
#[derive(Clone)]
pub struct RemoteController {
    tx: mpsc::UnboundedSender<Message>,
    status: watch::Receiver<AuthStatus>,
    remote: watch::Receiver<RemoteInformation>,
    _guard: Arc<ShutdownGuard>,
}

impl std::fmt::Debug for RemoteController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteController")
            .field("status", &self.status())
            .field("remote", &self.remote_info())
            .finish()
    }
}

fn controller_gone() -> EmbedError {
    EmbedError::internal("remote controller task has stopped")
}

impl RemoteController {
    /// Create a controller and spawn its task on the current tokio runtime
    ///
    /// Nothing connects until [`start`](Self::start). When `expected_uuid` is
    /// set, a device reporting another UUID triggers
    /// [`RemoteControllerListener::remote_uuid_mismatch`].
    pub fn new(
        transport: Arc<dyn Transport>,
        config: ControllerConfig,
        identity: LocalIdentity,
        expected_uuid: Option<Uuid>,
    ) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(AuthStatus::NotStarted);
        let (remote_tx, remote) = watch::channel(RemoteInformation::not_connected());

        let actor = ControllerActor {
            policy: config.reconnect_policy(),
            tracker: CorrelationTracker::new(config.ack_timeout()),
            transport,
            config,
            identity,
            expected_uuid: expected_uuid.filter(|uuid| !uuid.is_nil()),
            rx,
            self_tx: tx.clone(),
            status_tx,
            remote_tx,
            listeners: Vec::new(),
            sync: MenuTreeSynchronizer::new(),
            decoder: FrameDecoder::new(),
            epoch: 0,
            status: AuthStatus::NotStarted,
            last_received: Instant::now(),
            reconnect_attempts: 0,
            mismatch_warned: false,
            tasks: Vec::new(),
        };
        tokio::spawn(actor.run());

        Ok(Self {
            _guard: Arc::new(ShutdownGuard { tx: tx.clone() }),
            tx,
            status,
            remote,
        })
    }

    fn post(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| controller_gone())
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Message) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.post(make(reply))?;
        response.await.map_err(|_| controller_gone())
    }

    /// Begin connecting; does nothing while a connection is already live
    pub fn start(&self) -> Result<()> {
        self.post(Message::Start)
    }

    /// Disconnect and cancel any pending reconnect, returns once done
    pub async fn stop(&self) -> Result<()> {
        self.request(|done| Message::Stop { done }).await
    }

    /// Disconnect and end the controller task
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }

    pub fn add_listener(&self, listener: Arc<dyn RemoteControllerListener>) -> Result<()> {
        self.post(Message::AddListener(listener))
    }

    /// Move an item's value by `delta` steps
    pub async fn send_delta_change(&self, item_id: u16, delta: i32) -> Result<CorrelationId> {
        let change = ChangeData::Delta(delta);
        self.request(|reply| Message::SendChange {
            item_id,
            change,
            reply,
        })
        .await?
    }

    /// Set an item to a new value
    pub async fn send_absolute_change(&self, item_id: u16, value: MenuValue) -> Result<CorrelationId> {
        let change = ChangeData::from_value(&value);
        self.request(|reply| Message::SendChange {
            item_id,
            change,
            reply,
        })
        .await?
    }

    /// Press a button on the dialog the device is showing
    pub async fn send_dialog_action(&self, button: DialogButton) -> Result<CorrelationId> {
        self.request(|reply| Message::DialogAction { button, reply })
            .await?
    }

    /// Ask the device to resend its item names for `locale`
    pub async fn request_names(&self, locale: impl Into<String>) -> Result<()> {
        let locale = locale.into();
        self.request(|reply| Message::RequestNames { locale, reply })
            .await?
    }

    /// Snapshot of the mirrored menu tree
    pub async fn tree(&self) -> Result<MenuTree> {
        self.request(Message::Snapshot).await
    }

    pub async fn value_of(&self, id: u16) -> Result<Option<MenuValue>> {
        self.request(|reply| Message::ValueOf { id, reply }).await
    }

    pub fn status(&self) -> AuthStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AuthStatus> {
        self.status.clone()
    }

    /// Identity of the device, a placeholder until it has joined
    pub fn remote_info(&self) -> RemoteInformation {
        self.remote.borrow().clone()
    }

    /// Wait until the status satisfies `predicate` and return that status
    pub async fn wait_for_status<F>(&self, mut predicate: F, limit: Duration) -> Result<AuthStatus>
    where
        F: FnMut(AuthStatus) -> bool,
    {
        let mut status = self.status.clone();
        let reached = timeout(limit, status.wait_for(|s| predicate(*s)))
            .await
            .map_err(|_| {
                EmbedError::Timeout(TimeoutError::Connect {
                    millis: limit.as_millis() as u64,
                })
            })?
            .map_err(|_| controller_gone())?;
        Ok(*reached)
    }
}

struct ControllerActor {
    transport: Arc<dyn Transport>,
    config: ControllerConfig,
    policy: ReconnectPolicy,
    identity: LocalIdentity,
    expected_uuid: Option<Uuid>,
    rx: mpsc::UnboundedReceiver<Message>,
    self_tx: mpsc::UnboundedSender<Message>,
    status_tx: watch::Sender<AuthStatus>,
    remote_tx: watch::Sender<RemoteInformation>,
    listeners: Vec<Arc<dyn RemoteControllerListener>>,
    sync: MenuTreeSynchronizer,
    tracker: CorrelationTracker,
    decoder: FrameDecoder,
    /// Bumped for every connection attempt and teardown
    epoch: u64,
    status: AuthStatus,
    last_received: Instant,
    /// Consecutive failed connections, reset once a bootstrap completes
    reconnect_attempts: u32,
    mismatch_warned: bool,
    /// Link, ticker and reconnect timer of the current epoch
    tasks: Vec<JoinHandle<()>>,
}

impl ControllerActor {
    async fn run(mut self) {
        debug!("Remote controller task started for {}", self.transport.name());
        while let Some(message) = self.rx.recv().await {
            if !self.handle(message).await {
                break;
            }
        }
        self.end_connection().await;
        debug!("Remote controller task finished");
    }

    /// Returns false when the actor should stop
    async fn handle(&mut self, message: Message) -> bool {
        match message {
            Message::Start => self.start().await,
            Message::Stop { done } => {
                self.end_connection().await;
                self.reconnect_attempts = 0;
                self.set_status(AuthStatus::NotStarted);
                let _ = done.send(());
            }
            Message::Shutdown => {
                info!("Shutting down remote controller");
                return false;
            }
            Message::AddListener(listener) => self.listeners.push(listener),
            Message::SendChange {
                item_id,
                change,
                reply,
            } => {
                let result = self.send_change(item_id, change).await;
                let _ = reply.send(result);
            }
            Message::DialogAction { button, reply } => {
                let result = self.send_dialog_action(button).await;
                let _ = reply.send(result);
            }
            Message::RequestNames { locale, reply } => {
                let result = match self.require_ready() {
                    Ok(()) => self.write(&MenuCommand::NamesRequest { locale }).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Message::Snapshot(reply) => {
                let _ = reply.send(self.sync.tree().clone());
            }
            Message::ValueOf { id, reply } => {
                let value = (id != ROOT_ID)
                    .then(|| self.sync.tree().value_of(id))
                    .flatten();
                let _ = reply.send(value);
            }
            Message::Connected { epoch } if epoch == self.epoch => self.on_connected().await,
            Message::ConnectFailed { epoch, error } if epoch == self.epoch => {
                self.go_failed(error).await;
            }
            Message::Transport { epoch, event } if epoch == self.epoch => {
                self.on_transport_event(event).await;
            }
            Message::Tick { epoch } if epoch == self.epoch => self.on_tick().await,
            Message::ReconnectDue { epoch } if epoch == self.epoch => {
                if self.status == AuthStatus::ConnectionFailed {
                    info!("Reconnecting (attempt {})", self.reconnect_attempts + 1);
                    self.begin_connect();
                }
            }
            Message::Connected { .. }
            | Message::ConnectFailed { .. }
            | Message::Transport { .. }
            | Message::Tick { .. }
            | Message::ReconnectDue { .. } => {
                trace!("Ignoring message from an earlier connection attempt");
            }
        }
        true
    }

    async fn start(&mut self) {
        match self.status {
            AuthStatus::NotStarted | AuthStatus::FailedAuth | AuthStatus::ConnectionFailed => {
                self.end_connection().await;
                self.reconnect_attempts = 0;
                self.begin_connect();
            }
            status => debug!("Start ignored, connection is {}", status),
        }
    }

    fn begin_connect(&mut self) {
        self.cancel_tasks();
        self.epoch += 1;
        self.set_status(AuthStatus::AwaitingConnection);
        self.spawn_link();
    }

    /// Connect, then forward the transport's events in order
    fn spawn_link(&mut self) {
        let epoch = self.epoch;
        let tx = self.self_tx.clone();
        let transport = self.transport.clone();
        let limit = self.config.connect_timeout();

        self.tasks.push(tokio::spawn(async move {
            let (events_tx, mut events) = mpsc::unbounded_channel();
            let connected = match timeout(limit, transport.connect(events_tx)).await {
                Ok(result) => result,
                Err(_) => Err(EmbedError::Timeout(TimeoutError::Connect {
                    millis: limit.as_millis() as u64,
                })),
            };
            if let Err(error) = connected {
                let _ = tx.send(Message::ConnectFailed { epoch, error });
                return;
            }
            if tx.send(Message::Connected { epoch }).is_err() {
                return;
            }
            while let Some(event) = events.recv().await {
                if tx.send(Message::Transport { epoch, event }).is_err() {
                    break;
                }
            }
        }));
    }

    fn spawn_ticker(&mut self) {
        let epoch = self.epoch;
        let tx = self.self_tx.clone();
        let period = self.config.heartbeat_interval();

        self.tasks.push(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Message::Tick { epoch }).is_err() {
                    break;
                }
            }
        }));
    }

    fn spawn_reconnect_timer(&mut self, delay: Duration) {
        let epoch = self.epoch;
        let tx = self.self_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Message::ReconnectDue { epoch });
        }));
    }

    fn cancel_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Tear down the current connection and invalidate its tasks
    async fn end_connection(&mut self) {
        self.cancel_tasks();
        self.epoch += 1;
        self.transport.disconnect().await;
        self.decoder.clear();
        if self.tracker.outstanding() > 0 {
            debug!(
                "Forgetting {} unacknowledged command(s)",
                self.tracker.outstanding()
            );
            self.tracker.clear();
        }
    }

    async fn on_connected(&mut self) {
        info!("Transport {} connected, sending join", self.transport.name());
        self.decoder.clear();
        self.last_received = Instant::now();
        self.mismatch_warned = false;
        // every connection bootstraps from scratch, even without a Start marker
        self.sync.begin_bootstrap();
        self.set_status(AuthStatus::EstablishingConnection);

        let join = MenuCommand::Join {
            name: self.identity.name.clone(),
            uuid: self.identity.uuid,
            api_version: API_VERSION,
            platform: ApiPlatform::RemoteApi,
            serial_number: 0,
        };
        let heartbeat = MenuCommand::Heartbeat {
            interval_ms: self.heartbeat_interval_ms(),
            mode: HeartbeatMode::Start,
        };
        if self.write(&join).await.is_err() || self.write(&heartbeat).await.is_err() {
            return;
        }
        self.spawn_ticker();
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Data(data) => {
                self.last_received = Instant::now();
                let epoch = self.epoch;
                for result in self.decoder.decode(&data) {
                    match result {
                        Ok(command) => self.process(command).await,
                        Err(e) => warn!("Discarding frame from device: {}", e),
                    }
                    // processing may have torn the connection down
                    if self.epoch != epoch {
                        break;
                    }
                }
            }
            TransportEvent::Closed(reason) => {
                self.go_failed(ConnectionError::Closed { reason }.into())
                    .await;
            }
        }
    }

    async fn process(&mut self, command: MenuCommand) {
        debug!("Received {} from device", command.name());
        match command {
            MenuCommand::Join {
                name,
                uuid,
                api_version,
                platform,
                serial_number,
            } => {
                let remote =
                    RemoteInformation::from_join(&name, uuid, api_version, platform, serial_number);
                info!("Device joined: {}", remote);
                self.remote_tx.send_replace(remote);
                self.check_remote_uuid(uuid);
                self.set_status(AuthStatus::Authenticating);
            }
            MenuCommand::Heartbeat {
                mode: HeartbeatMode::End,
                ..
            } => {
                self.go_failed(
                    ConnectionError::Closed {
                        reason: "device ended the session".to_string(),
                    }
                    .into(),
                )
                .await;
            }
            MenuCommand::Heartbeat { .. } => {}
            MenuCommand::Bootstrap {
                phase: BootPhase::Start,
            } => {
                self.set_status(AuthStatus::Bootstrapping);
                self.sync.begin_bootstrap();
            }
            MenuCommand::Bootstrap {
                phase: BootPhase::Complete,
            } => {
                let outcome = self.sync.complete_bootstrap();
                if outcome.orphans_dropped > 0 {
                    warn!(
                        "Bootstrap finished with {} item(s) missing their parent",
                        outcome.orphans_dropped
                    );
                }
                self.reconnect_attempts = 0;
                info!("Menu tree received, {} item(s)", self.sync.tree().len());
                self.set_status(AuthStatus::ConnectionReady);
                if outcome.first_completion {
                    self.notify(|l| l.tree_fully_populated());
                }
            }
            MenuCommand::ItemBoot {
                parent_id,
                item,
                value,
            } => {
                let events = self.sync.apply_boot(parent_id, item, value);
                self.notify_items(&events);
            }
            MenuCommand::Change {
                item_id, change, ..
            } => {
                if let Some(event) = self.sync.apply_change(item_id, &change) {
                    self.notify_items(std::slice::from_ref(&event));
                }
            }
            MenuCommand::Ack {
                correlation,
                status,
            } => self.on_ack(correlation, status).await,
            MenuCommand::Dialog(dialog) => self.notify(|l| l.dialog_update(&dialog)),
            MenuCommand::PairingResponse { accepted: false } => {
                self.fail_auth(AuthError::PairingRejected).await;
            }
            MenuCommand::PairingResponse { accepted: true } => {
                info!("Device accepted pairing");
            }
            other @ (MenuCommand::PairingRequest { .. } | MenuCommand::NamesRequest { .. }) => {
                debug!("Ignoring {} sent by device", other.name());
            }
        }
    }

    async fn on_ack(&mut self, correlation: CorrelationId, status: AckStatus) {
        if status == AckStatus::InvalidCredentials && self.status != AuthStatus::ConnectionReady {
            self.fail_auth(AuthError::InvalidCredentials {
                name: self.identity.name.clone(),
            })
            .await;
            return;
        }
        if correlation.is_none() {
            debug!("Uncorrelated acknowledgement {}", status);
            return;
        }
        let Some(item) = self.tracker.resolve(correlation) else {
            debug!("Acknowledgement for unknown correlation {}", correlation);
            return;
        };
        if status.is_error() {
            warn!("Device reported {} for {}", status, correlation);
        }
        self.notify(|l| l.ack_received(correlation, item.as_ref(), status));
    }

    async fn on_tick(&mut self) {
        let expired = self.tracker.purge_expired(Instant::now());
        if !expired.is_empty() {
            debug!("{} command(s) were never acknowledged", expired.len());
        }

        if self.status == AuthStatus::ConnectionReady {
            let heartbeat = MenuCommand::Heartbeat {
                interval_ms: self.heartbeat_interval_ms(),
                mode: HeartbeatMode::Normal,
            };
            if self.write(&heartbeat).await.is_err() {
                return;
            }
        }

        let silence = self.last_received.elapsed();
        if self.status.is_connected() && silence > self.config.heartbeat_timeout() {
            self.go_failed(
                TimeoutError::Heartbeat {
                    millis: silence.as_millis() as u64,
                }
                .into(),
            )
            .await;
        }
    }

    fn check_remote_uuid(&mut self, actual: Uuid) {
        let Some(expected) = self.expected_uuid else {
            return;
        };
        if expected == actual || self.mismatch_warned {
            return;
        }
        self.mismatch_warned = true;
        warn!("Expected device {} but {} joined", expected, actual);
        self.notify(|l| l.remote_uuid_mismatch(expected, actual));
    }

    fn require_ready(&self) -> Result<()> {
        if self.status == AuthStatus::ConnectionReady {
            Ok(())
        } else {
            Err(EmbedError::not_connected(self.transport.name()))
        }
    }

    async fn send_change(&mut self, item_id: u16, change: ChangeData) -> Result<CorrelationId> {
        self.require_ready()?;
        let correlation = self.tracker.next_id();
        let (command, item) = self.sync.prepare_change(item_id, change, correlation)?;
        self.write(&command).await?;
        self.tracker.register(correlation, Some(item.clone()));
        self.notify(|l| l.menu_item_changed(&item, true));
        Ok(correlation)
    }

    async fn send_dialog_action(&mut self, button: DialogButton) -> Result<CorrelationId> {
        self.require_ready()?;
        let correlation = self.tracker.next_id();
        let command = MenuCommand::Dialog(DialogCommand {
            mode: DialogMode::Action,
            header: String::new(),
            message: String::new(),
            button1: button,
            button2: DialogButton::None,
            correlation,
        });
        self.write(&command).await?;
        self.tracker.register(correlation, None);
        Ok(correlation)
    }

    /// Send a command; a failed write takes the connection down
    async fn write(&mut self, command: &MenuCommand) -> Result<()> {
        match send_command(self.transport.as_ref(), command).await {
            Ok(()) => Ok(()),
            Err(e @ EmbedError::Protocol(_)) => Err(e),
            Err(e) => {
                let reason = e.to_string();
                self.go_failed(e).await;
                Err(ConnectionError::WriteFailed { reason }.into())
            }
        }
    }

    async fn go_failed(&mut self, error: EmbedError) {
        warn!("Connection to device lost: {}", error);
        self.end_connection().await;
        self.set_status(AuthStatus::ConnectionFailed);

        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
        if self.policy.should_retry(self.reconnect_attempts) {
            let delay = self.policy.delay_for_attempt(self.reconnect_attempts);
            info!("Reconnecting in {:?}", delay);
            self.spawn_reconnect_timer(delay);
        } else {
            warn!(
                "Giving up after {} failed connection attempt(s)",
                self.reconnect_attempts
            );
        }
    }

    async fn fail_auth(&mut self, error: AuthError) {
        warn!("{}", EmbedError::from(error).user_message());
        self.end_connection().await;
        self.set_status(AuthStatus::FailedAuth);
    }

    fn heartbeat_interval_ms(&self) -> u32 {
        u32::try_from(self.config.heartbeat_interval_ms).unwrap_or(u32::MAX)
    }

    fn set_status(&mut self, status: AuthStatus) {
        if self.status == status {
            return;
        }
        info!("Connection state {} -> {}", self.status, status);
        self.status = status;
        self.status_tx.send_replace(status);
        let remote = self.remote_tx.borrow().clone();
        self.notify(|l| l.connection_state(&remote, status));
    }

    fn notify_items(&self, events: &[TreeEvent]) {
        for event in events {
            self.notify(|l| l.menu_item_changed(&event.item, event.value_only));
        }
    }

    /// Call every listener, a panicking listener is logged and skipped
    fn notify(&self, call: impl Fn(&dyn RemoteControllerListener)) {
        for listener in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| call(listener.as_ref()))).is_err() {
                warn!("Remote controller listener panicked");
            }
        }
    }
}

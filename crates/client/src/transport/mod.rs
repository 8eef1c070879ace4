//! Transport abstraction for the embedctl client
//!
//! A transport is a bidirectional byte channel to one device. Received bytes
//! are pushed as [`TransportEvent`]s into the channel handed to
//! [`Transport::connect`], from a background task, in arrival order. Writes
//! may come from several tasks at once; each implementation serializes them.

use async_trait::async_trait;
use bytes::Bytes;
use embedctl_core::Result;
use embedctl_core::protocol::{MenuCommand, encode};
use tokio::sync::mpsc;
use tracing::trace;

pub mod serial;
pub mod simulator;
pub mod tcp;

pub use serial::{SerialTransport, SerialTransportConfig};
pub use simulator::{SimulatedItem, SimulatorScript, SimulatorTransport};
pub use tcp::{TcpTransport, TcpTransportConfig};

/// Something that happened on an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Data(Bytes),
    /// The connection ended without us asking, with a reason for the logs
    Closed(String),
}

/// Sending half handed to a transport on connect
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Trait for transport implementations
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel; connecting an open transport is a no-op
    async fn connect(&self, events: EventSender) -> Result<()>;

    /// Close the channel, safe to call at any time and more than once
    ///
    /// No `Closed` event is emitted for a disconnect the caller asked for.
    async fn disconnect(&self);

    /// Write raw bytes, fails with `NotConnected` when the channel is closed
    async fn write(&self, data: Bytes) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Get the name of this transport type
    fn name(&self) -> &'static str;
}

/// Encode a command and write it as one frame
pub async fn send_command(transport: &dyn Transport, command: &MenuCommand) -> Result<()> {
    let frame = encode(command)?;
    trace!(
        transport = transport.name(),
        command = command.name(),
        bytes = frame.len(),
        "Sending frame"
    );
    transport.write(frame).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedctl_core::EmbedError;
    use embedctl_core::menu::MenuItemBuilder;
    use embedctl_core::menu::MenuValue;

    #[tokio::test]
    async fn test_send_command_on_closed_transport() {
        let transport = SimulatorTransport::new(SimulatorScript::default());
        let result = send_command(&transport, &MenuCommand::bootstrap_start()).await;
        assert!(matches!(result, Err(EmbedError::Connection(_))));
    }

    #[tokio::test]
    async fn test_send_command_rejects_unencodable() {
        let transport = SimulatorTransport::new(SimulatorScript::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        transport.connect(tx).await.unwrap();

        let command = MenuCommand::ItemBoot {
            parent_id: 0,
            item: MenuItemBuilder::custom_builder(4, "Wifi", "iot").build(),
            value: MenuValue::Text(String::new()),
        };
        let result = send_command(&transport, &command).await;
        assert!(matches!(result, Err(EmbedError::Protocol(_))));
        assert!(transport.received().is_empty());
    }
}

//! One-shot pairing with a device
//!
//! A device that answers our join with `InvalidCredentials` does not know this
//! client yet. Pairing opens the transport on its own, asks the device to
//! trust our identity and closes it again; the controller is then started
//! afresh.

use crate::transport::{Transport, TransportEvent, send_command};
use embedctl_core::error::{ConnectionError, EmbedError, Result, TimeoutError};
use embedctl_core::protocol::{AckStatus, FrameDecoder, MenuCommand};
use embedctl_core::remote::LocalIdentity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How a pairing request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingOutcome {
    Paired,
    Rejected,
}

/// Ask the device behind `transport` to accept `identity`
///
/// The transport must not be in use by a running controller. It is
/// disconnected before this returns, whatever the outcome.
pub async fn pair_with_device(
    transport: Arc<dyn Transport>,
    identity: &LocalIdentity,
    limit: Duration,
) -> Result<PairingOutcome> {
    info!("Requesting pairing as {} ({})", identity.name, identity.uuid);
    let result = tokio::time::timeout(limit, exchange(transport.as_ref(), identity))
        .await
        .unwrap_or_else(|_| {
            Err(EmbedError::Timeout(TimeoutError::Pairing {
                millis: limit.as_millis() as u64,
            }))
        });
    transport.disconnect().await;

    match &result {
        Ok(PairingOutcome::Paired) => info!("Device accepted pairing"),
        Ok(PairingOutcome::Rejected) => warn!("Device rejected pairing"),
        Err(e) => warn!("Pairing failed: {}", e),
    }
    result
}

async fn exchange(transport: &dyn Transport, identity: &LocalIdentity) -> Result<PairingOutcome> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    transport.connect(events_tx).await?;

    let request = MenuCommand::PairingRequest {
        name: identity.name.clone(),
        uuid: identity.uuid,
    };
    send_command(transport, &request).await?;

    let mut decoder = FrameDecoder::new();
    while let Some(event) = events.recv().await {
        let data = match event {
            TransportEvent::Data(data) => data,
            TransportEvent::Closed(reason) => {
                return Err(ConnectionError::Closed { reason }.into());
            }
        };
        for result in decoder.decode(&data) {
            match result {
                Ok(MenuCommand::PairingResponse { accepted }) => {
                    return Ok(outcome(accepted));
                }
                Ok(MenuCommand::Ack { status, .. }) => {
                    return Ok(outcome(status == AckStatus::Success));
                }
                Ok(other) => debug!("Ignoring {} while pairing", other.name()),
                Err(e) => warn!("Discarding frame while pairing: {}", e),
            }
        }
    }

    Err(ConnectionError::Closed {
        reason: "transport stopped delivering events".to_string(),
    }
    .into())
}

fn outcome(accepted: bool) -> PairingOutcome {
    if accepted {
        PairingOutcome::Paired
    } else {
        PairingOutcome::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{SimulatorScript, SimulatorTransport};
    use uuid::Uuid;

    fn identity() -> LocalIdentity {
        LocalIdentity::new("bench", Uuid::from_u128(7))
    }

    #[tokio::test]
    async fn test_pairing_accepted() {
        let sim = Arc::new(SimulatorTransport::new(SimulatorScript::default()));
        let outcome = pair_with_device(sim.clone(), &identity(), Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(outcome, PairingOutcome::Paired);
        assert!(!sim.is_connected());
        assert_eq!(
            sim.received(),
            vec![MenuCommand::PairingRequest {
                name: "bench".to_string(),
                uuid: Uuid::from_u128(7),
            }]
        );
    }

    #[tokio::test]
    async fn test_pairing_rejected() {
        let script = SimulatorScript {
            accept_pairing: false,
            ..SimulatorScript::default()
        };
        let sim = Arc::new(SimulatorTransport::new(script));
        let outcome = pair_with_device(sim, &identity(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(outcome, PairingOutcome::Rejected);
    }

    /// Accepts writes and never answers
    #[derive(Default)]
    struct SilentDevice {
        events: std::sync::Mutex<Option<crate::transport::EventSender>>,
    }

    #[async_trait::async_trait]
    impl Transport for SilentDevice {
        async fn connect(&self, events: crate::transport::EventSender) -> Result<()> {
            *self.events.lock().unwrap() = Some(events);
            Ok(())
        }

        async fn disconnect(&self) {
            self.events.lock().unwrap().take();
        }

        async fn write(&self, _data: bytes::Bytes) -> Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.events.lock().unwrap().is_some()
        }

        fn name(&self) -> &'static str {
            "silent"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairing_times_out_on_silent_device() {
        let device = Arc::new(SilentDevice::default());
        let result = pair_with_device(device.clone(), &identity(), Duration::from_millis(200)).await;
        assert!(matches!(
            result,
            Err(EmbedError::Timeout(TimeoutError::Pairing { millis: 200 }))
        ));
        assert!(!device.is_connected());
    }
}

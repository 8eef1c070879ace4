//! End to end over a real socket, with a minimal device on the other side

use anyhow::Result;
use embedctl_client::{RemoteController, create_transport_with_timeout};
use embedctl_core::config::{ConnectionDescriptor, ControllerConfig};
use embedctl_core::menu::{BooleanNaming, MenuItemBuilder, MenuValue, ROOT_ID};
use embedctl_core::protocol::{
    API_VERSION, AckStatus, FrameDecoder, HeartbeatMode, MenuCommand, encode,
};
use embedctl_core::remote::{ApiPlatform, AuthStatus, LocalIdentity};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Answers like a small device and reports every command it receives
async fn run_device(mut socket: TcpStream, seen: mpsc::UnboundedSender<MenuCommand>) -> Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; 256];
    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        for command in decoder.decode(&buf[..n]) {
            let command = command?;
            let replies = match &command {
                MenuCommand::Join { .. } => vec![
                    MenuCommand::Join {
                        name: "Bench Amp".to_string(),
                        uuid: Uuid::from_u128(99),
                        api_version: API_VERSION,
                        platform: ApiPlatform::Arduino32,
                        serial_number: 42,
                    },
                    MenuCommand::bootstrap_start(),
                    MenuCommand::item_boot(
                        ROOT_ID,
                        MenuItemBuilder::boolean(1, "Power", BooleanNaming::OnOff).build(),
                        MenuValue::Bool(false),
                    ),
                    MenuCommand::bootstrap_complete(),
                ],
                MenuCommand::Heartbeat { .. } => vec![MenuCommand::Heartbeat {
                    interval_ms: 1500,
                    mode: HeartbeatMode::Normal,
                }],
                MenuCommand::Change { correlation, .. } => vec![MenuCommand::Ack {
                    correlation: *correlation,
                    status: AckStatus::Success,
                }],
                _ => Vec::new(),
            };
            for reply in replies {
                socket.write_all(&encode(&reply)?).await?;
            }
            let _ = seen.send(command);
        }
    }
}

async fn accept_device(
    listener: TcpListener,
    seen: mpsc::UnboundedSender<MenuCommand>,
) -> Result<()> {
    let (socket, _) = listener.accept().await?;
    run_device(socket, seen).await
}

#[tokio::test]
async fn test_controller_over_tcp() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    let device = tokio::spawn(accept_device(listener, seen_tx));

    let descriptor = ConnectionDescriptor::socket("bench", "127.0.0.1", port);
    let transport = create_transport_with_timeout(&descriptor, Duration::from_secs(2))?;
    let config = ControllerConfig {
        heartbeat_interval_ms: 100,
        heartbeat_timeout_ms: 1000,
        ..ControllerConfig::default()
    };
    let controller = RemoteController::new(
        transport,
        config,
        LocalIdentity::new("tcp-test", Uuid::from_u128(1)),
        None,
    )?;

    controller.start()?;
    controller
        .wait_for_status(|s| s == AuthStatus::ConnectionReady, Duration::from_secs(5))
        .await?;
    assert_eq!(controller.remote_info().name, "Bench Amp");
    assert_eq!(controller.remote_info().serial_number, 42);
    assert_eq!(controller.value_of(1).await?, Some(MenuValue::Bool(false)));

    let correlation = controller
        .send_absolute_change(1, MenuValue::Bool(true))
        .await?;
    let change = loop {
        match tokio::time::timeout(Duration::from_secs(5), seen.recv()).await? {
            Some(command @ MenuCommand::Change { .. }) => break command,
            Some(_) => continue,
            None => anyhow::bail!("device stopped before the change arrived"),
        }
    };
    assert!(matches!(change, MenuCommand::Change { correlation: c, item_id: 1, .. } if c == correlation));
    assert_eq!(controller.value_of(1).await?, Some(MenuValue::Bool(true)));

    controller.stop().await?;
    assert_eq!(controller.status(), AuthStatus::NotStarted);
    tokio::time::timeout(Duration::from_secs(5), device).await???;
    Ok(())
}

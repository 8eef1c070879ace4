//! TCP transport implementation
//!
//! Connects to a device (or a serial bridge) listening on a TCP socket.

use super::{EventSender, Transport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use embedctl_core::error::{ConnectionError, EmbedError, Result, TimeoutError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, lookup_host};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// TCP transport configuration
#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    pub host: String,
    pub port: u16,
    pub connection_timeout: Duration,
    pub keepalive: bool,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3333,
            connection_timeout: Duration::from_secs(5),
            keepalive: true,
        }
    }
}

struct TcpConnection {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

/// TCP transport implementation
pub struct TcpTransport {
    config: TcpTransportConfig,
    connection: Mutex<Option<TcpConnection>>,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl TcpTransport {
    pub fn new(config: TcpTransportConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &TcpTransportConfig {
        &self.config
    }

    fn target(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Resolve the host and try each address in turn
    async fn connect_tcp(&self) -> Result<TcpStream> {
        let addr = self.target();
        let connect_failed = |reason: String| {
            EmbedError::Connection(ConnectionError::ConnectFailed {
                target: addr.clone(),
                reason,
            })
        };

        let socket_addrs: Vec<SocketAddr> = lookup_host(&addr)
            .await
            .map_err(|e| connect_failed(format!("cannot resolve address: {e}")))?
            .collect();

        if socket_addrs.is_empty() {
            return Err(EmbedError::Connection(ConnectionError::NotFound {
                target: self.target(),
            }));
        }
        debug!("Resolved addresses: {:?}", socket_addrs);

        let mut last_error = None;
        for socket_addr in socket_addrs {
            debug!("Attempting to connect to {}", socket_addr);
            match timeout(self.config.connection_timeout, TcpStream::connect(socket_addr)).await {
                Ok(Ok(stream)) => {
                    if self.config.keepalive {
                        socket2::SockRef::from(&stream).set_keepalive(true)?;
                    }
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    warn!("Failed to connect to {}: {}", socket_addr, e);
                    last_error = Some(connect_failed(e.to_string()));
                }
                Err(_) => {
                    warn!(
                        "Connection timeout after {:?} to {}",
                        self.config.connection_timeout, socket_addr
                    );
                    last_error = Some(EmbedError::Timeout(TimeoutError::Connect {
                        millis: self.config.connection_timeout.as_millis() as u64,
                    }));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| connect_failed("no address accepted".to_string())))
    }
}

async fn read_loop(mut reader: OwnedReadHalf, events: EventSender, connected: Arc<AtomicBool>) {
    let mut buf = vec![0u8; 1024];
    let reason = loop {
        match reader.read(&mut buf).await {
            Ok(0) => break "remote closed the connection".to_string(),
            Ok(n) => {
                if events
                    .send(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    debug!("Event receiver dropped, stopping TCP reader");
                    return;
                }
            }
            Err(e) => break e.to_string(),
        }
    };
    connected.store(false, Ordering::SeqCst);
    debug!("TCP reader finished: {}", reason);
    let _ = events.send(TransportEvent::Closed(reason));
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, events: EventSender) -> Result<()> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() && self.is_connected() {
            return Ok(());
        }
        if let Some(stale) = connection.take() {
            stale.reader.abort();
        }

        info!("Establishing TCP connection to {}", self.target());
        let stream = self.connect_tcp().await?;
        let (read_half, write_half) = stream.into_split();

        self.connected.store(true, Ordering::SeqCst);
        let reader = tokio::spawn(read_loop(read_half, events, self.connected.clone()));
        *connection = Some(TcpConnection {
            writer: write_half,
            reader,
        });

        info!("TCP connection established to {}", self.target());
        Ok(())
    }

    async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut conn) = connection.take() {
            conn.reader.abort();
            if let Err(e) = conn.writer.shutdown().await {
                debug!("Error shutting down TCP writer: {}", e);
            }
            info!("Disconnected from {}", self.target());
        }
    }

    async fn write(&self, data: Bytes) -> Result<()> {
        let mut connection = self.connection.lock().await;
        let conn = match connection.as_mut() {
            Some(conn) if self.is_connected() => conn,
            _ => return Err(EmbedError::not_connected(self.name())),
        };
        if let Err(e) = conn.writer.write_all(&data).await {
            self.connected.store(false, Ordering::SeqCst);
            return Err(EmbedError::Connection(ConnectionError::WriteFailed {
                reason: e.to_string(),
            }));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn config_for(port: u16) -> TcpTransportConfig {
        TcpTransportConfig {
            host: "127.0.0.1".to_string(),
            port,
            connection_timeout: Duration::from_secs(2),
            keepalive: true,
        }
    }

    #[test]
    fn test_default_tcp_config() {
        let config = TcpTransportConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3333);
        assert!(config.keepalive);
        assert_eq!(TcpTransport::new(config).name(), "tcp");
    }

    #[tokio::test]
    async fn test_write_before_connect_fails() {
        let transport = TcpTransport::new(config_for(1));
        let result = transport.write(Bytes::from_static(b"x")).await;
        assert!(matches!(
            result,
            Err(EmbedError::Connection(ConnectionError::NotConnected { .. }))
        ));
        transport.disconnect().await;
        transport.disconnect().await;
    }

    #[tokio::test]
    async fn test_round_trip_and_remote_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let transport = TcpTransport::new(config_for(port));
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.connect(tx.clone()).await.unwrap();
        transport.connect(tx).await.unwrap();
        assert!(transport.is_connected());

        transport.write(Bytes::from_static(b"hello")).await.unwrap();

        let mut echoed = Vec::new();
        let reason = loop {
            match rx.recv().await.unwrap() {
                TransportEvent::Data(data) => echoed.extend_from_slice(&data),
                TransportEvent::Closed(reason) => break reason,
            }
        };
        server.await.unwrap();

        assert_eq!(echoed, b"hello");
        assert!(!reason.is_empty());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = TcpTransport::new(config_for(port));
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(transport.connect(tx).await.is_err());
        assert!(!transport.is_connected());
    }
}

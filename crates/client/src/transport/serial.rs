//! Serial port transport
//!
//! `serialport` is blocking, so reads run on a dedicated thread that forwards
//! chunks into the event channel. Writes go through a cloned port handle
//! guarded by a mutex and run on the blocking pool. Disconnecting joins the
//! reader so the port is free again once it returns.

use super::{EventSender, Transport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use embedctl_core::error::{ConnectionError, EmbedError, Result};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Serial transport configuration
#[derive(Debug, Clone)]
pub struct SerialTransportConfig {
    pub port_name: String,
    pub baud: u32,
    /// How long a read blocks before the reader checks for shutdown
    pub read_timeout: Duration,
}

impl SerialTransportConfig {
    pub fn new(port_name: impl Into<String>, baud: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Reader thread of one connection
struct ReaderHandle {
    /// Cleared to stop the thread
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    fn spawn(
        name: String,
        body: impl FnOnce(Arc<AtomicBool>) + Send + 'static,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let thread = std::thread::Builder::new()
            .name(name)
            .spawn(move || body(thread_running))?;
        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait until it has released its port handle
    async fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(thread) = self.thread.take() else {
            return;
        };
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => {}
            _ => warn!("Serial reader thread ended abnormally"),
        }
    }
}

struct SerialConnection {
    writer: Box<dyn SerialPort>,
    reader: ReaderHandle,
}

impl SerialConnection {
    async fn close(self) {
        let SerialConnection { writer, reader } = self;
        drop(writer);
        reader.stop().await;
    }
}

/// Serial port transport implementation
pub struct SerialTransport {
    config: SerialTransportConfig,
    connection: Arc<Mutex<Option<SerialConnection>>>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("config", &self.config)
            .finish()
    }
}

/// Names of the serial ports present on this machine
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(|e| {
        EmbedError::Connection(ConnectionError::NotFound {
            target: format!("serial ports ({e})"),
        })
    })?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

fn lock_poisoned() -> EmbedError {
    EmbedError::internal("serial connection lock poisoned")
}

impl SerialTransport {
    pub fn new(config: SerialTransportConfig) -> Self {
        Self {
            config,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &SerialTransportConfig {
        &self.config
    }

    fn open(config: &SerialTransportConfig) -> Result<Box<dyn SerialPort>> {
        serialport::new(&config.port_name, config.baud)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => {
                    EmbedError::Connection(ConnectionError::NotFound {
                        target: config.port_name.clone(),
                    })
                }
                _ => EmbedError::Connection(ConnectionError::ConnectFailed {
                    target: config.port_name.clone(),
                    reason: e.to_string(),
                }),
            })
    }
}

fn read_loop(
    mut port: Box<dyn SerialPort>,
    events: EventSender,
    running: Arc<AtomicBool>,
    port_name: String,
) {
    let mut buf = [0u8; 512];
    let reason = loop {
        if !running.load(Ordering::SeqCst) {
            debug!("Serial reader for {} stopped", port_name);
            return;
        }
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                if events
                    .send(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                continue;
            }
            Err(e) => break e.to_string(),
        }
    };
    if running.swap(false, Ordering::SeqCst) {
        warn!("Serial port {} closed: {}", port_name, reason);
        let _ = events.send(TransportEvent::Closed(reason));
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&self, events: EventSender) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        info!(
            "Opening serial port {} at {} baud",
            self.config.port_name, self.config.baud
        );
        let config = self.config.clone();
        let port = tokio::task::spawn_blocking(move || Self::open(&config))
            .await
            .map_err(|e| EmbedError::internal(format!("serial open task failed: {e}")))??;
        let reader_port = port.try_clone().map_err(|e| {
            EmbedError::Connection(ConnectionError::ConnectFailed {
                target: self.config.port_name.clone(),
                reason: format!("cannot clone port handle: {e}"),
            })
        })?;

        let port_name = self.config.port_name.clone();
        let reader = ReaderHandle::spawn(format!("serial-{}", self.config.port_name), move |running| {
            read_loop(reader_port, events, running, port_name)
        })?;

        let old = self
            .connection
            .lock()
            .map_err(|_| lock_poisoned())?
            .replace(SerialConnection {
                writer: port,
                reader,
            });
        if let Some(old) = old {
            old.close().await;
        }
        Ok(())
    }

    async fn disconnect(&self) {
        let taken = match self.connection.lock() {
            Ok(mut connection) => connection.take(),
            Err(_) => {
                warn!("Serial connection lock poisoned during disconnect");
                None
            }
        };
        if let Some(conn) = taken {
            conn.close().await;
            info!("Closed serial port {}", self.config.port_name);
        }
    }

    async fn write(&self, data: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(EmbedError::not_connected(self.name()));
        }
        let connection = self.connection.clone();
        let name = self.name();
        tokio::task::spawn_blocking(move || {
            let mut guard = connection.lock().map_err(|_| lock_poisoned())?;
            let conn = guard
                .as_mut()
                .filter(|c| c.reader.is_running())
                .ok_or_else(|| EmbedError::not_connected(name))?;
            conn.writer
                .write_all(&data)
                .and_then(|_| conn.writer.flush())
                .map_err(|e| {
                    EmbedError::Connection(ConnectionError::WriteFailed {
                        reason: e.to_string(),
                    })
                })
        })
        .await
        .map_err(|e| EmbedError::internal(format!("serial write task failed: {e}")))?
    }

    fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .map(|guard| {
                guard
                    .as_ref()
                    .is_some_and(|conn| conn.reader.is_running())
            })
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_serial_config() {
        let config = SerialTransportConfig::new("/dev/ttyUSB0", 115_200);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        let transport = SerialTransport::new(config);
        assert_eq!(transport.name(), "serial");
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_reader_stop_waits_for_thread() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let reader = ReaderHandle::spawn("serial-test".to_string(), move |running| {
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(20));
            }
            // a read still blocked until its timeout
            std::thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
        assert!(reader.is_running());

        reader.stop().await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_port_fails_to_connect() {
        let transport = SerialTransport::new(SerialTransportConfig::new(
            "/dev/embedctl-no-such-port",
            9600,
        ));
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(transport.connect(tx).await.is_err());
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(Bytes::from_static(b"x")).await,
            Err(EmbedError::Connection(ConnectionError::NotConnected { .. }))
        ));
        transport.disconnect().await;
    }
}

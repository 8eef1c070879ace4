//! Transport factory
//!
//! Builds the transport a [`ConnectionDescriptor`] describes.

use crate::transport::{
    SerialTransport, SerialTransportConfig, SimulatorScript, SimulatorTransport, TcpTransport,
    TcpTransportConfig, Transport,
};
use embedctl_core::Result;
use embedctl_core::config::{ConnectionDescriptor, ConnectionKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Create a transport with the default TCP connect timeout
pub fn create_transport(descriptor: &ConnectionDescriptor) -> Result<Arc<dyn Transport>> {
    create_transport_with_timeout(descriptor, TcpTransportConfig::default().connection_timeout)
}

/// Create a transport; invalid descriptors fail here, before any I/O
pub fn create_transport_with_timeout(
    descriptor: &ConnectionDescriptor,
    connect_timeout: Duration,
) -> Result<Arc<dyn Transport>> {
    descriptor.validate()?;
    info!("Creating transport for {}", descriptor);

    let transport: Arc<dyn Transport> = match &descriptor.kind {
        ConnectionKind::Serial { port, baud } => Arc::new(SerialTransport::new(
            SerialTransportConfig::new(port.clone(), *baud),
        )),
        ConnectionKind::Socket { host, port } => Arc::new(TcpTransport::new(TcpTransportConfig {
            host: host.clone(),
            port: *port,
            connection_timeout: connect_timeout,
            ..TcpTransportConfig::default()
        })),
        ConnectionKind::Simulator { script } => {
            let script = match script {
                Some(path) => SimulatorScript::load(path)?,
                None => SimulatorScript::demo(),
            };
            Arc::new(SimulatorTransport::new(script))
        }
    };
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedctl_core::EmbedError;
    use std::io::Write;

    #[test]
    fn test_creates_each_kind() {
        let serial = ConnectionDescriptor::serial("desk", "/dev/ttyACM0", 115_200);
        assert_eq!(create_transport(&serial).unwrap().name(), "serial");

        let socket = ConnectionDescriptor::socket("amp", "192.168.0.20", 3333);
        assert_eq!(create_transport(&socket).unwrap().name(), "tcp");

        let sim = ConnectionDescriptor::simulator("sim", None);
        let transport = create_transport(&sim).unwrap();
        assert_eq!(transport.name(), "simulator");
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_invalid_descriptor_fails_fast() {
        let socket = ConnectionDescriptor::socket("amp", "", 3333);
        assert!(matches!(create_transport(&socket), Err(EmbedError::Config(_))));

        let serial = ConnectionDescriptor::serial("desk", "/dev/ttyACM0", 0);
        assert!(matches!(create_transport(&serial), Err(EmbedError::Config(_))));
    }

    #[test]
    fn test_simulator_script_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "device_name": "Bench PSU", "accept_auth": false }}"#).unwrap();

        let sim = ConnectionDescriptor::simulator("sim", Some(file.path().to_path_buf()));
        assert!(create_transport(&sim).is_ok());

        let missing = ConnectionDescriptor::simulator(
            "sim",
            Some(std::path::PathBuf::from("/nonexistent/embedctl-script.json")),
        );
        assert!(matches!(create_transport(&missing), Err(EmbedError::Config(_))));
    }
}

//! Configuration management for embedctl

use crate::error::retry::ReconnectPolicy;
use crate::error::{ConfigError, EmbedError, Result};
use crate::logging::LoggingConfig;
use crate::remote::LocalIdentity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Main configuration structure for embedctl
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmbedConfig {
    /// Timing of the remote controller
    #[serde(default)]
    pub controller: ControllerConfig,
    /// How this client identifies itself to devices
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Saved connections
    #[serde(default)]
    pub connections: Vec<ConnectionDescriptor>,
}

/// Remote controller timing, all values in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// How often a heartbeat is sent once the connection is ready
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Silence from the device longer than this drops the connection
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Outstanding acknowledgements older than this are forgotten
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_ms: u64,
    #[serde(default = "default_pairing_timeout")]
    pub pairing_timeout_ms: u64,
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,
    /// Give up reconnecting after this many attempts
    #[serde(default)]
    pub reconnect_max_attempts: Option<u32>,
}

/// Identity sent in Join and pairing messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_client_name")]
    pub name: String,
    /// Generated on first use and kept once the config is saved
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
}

/// How to reach one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    /// Opaque data kept for front ends
    #[serde(default)]
    pub extra_data: Option<String>,
    /// Device uuid seen on a previous connection
    #[serde(default)]
    pub remote_uuid: Option<Uuid>,
    pub kind: ConnectionKind,
}

/// Transport specific part of a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionKind {
    Serial {
        port: String,
        #[serde(default = "default_baud")]
        baud: u32,
    },
    Socket {
        host: String,
        port: u16,
    },
    /// In-process simulated device, optionally driven by a JSON script
    Simulator {
        #[serde(default)]
        script: Option<PathBuf>,
    },
}

fn default_heartbeat_interval() -> u64 {
    1500
}
fn default_heartbeat_timeout() -> u64 {
    5000
}
fn default_connect_timeout() -> u64 {
    5000
}
fn default_ack_timeout() -> u64 {
    10_000
}
fn default_pairing_timeout() -> u64 {
    15_000
}
fn default_reconnect_initial() -> u64 {
    500
}
fn default_reconnect_max() -> u64 {
    30_000
}
fn default_reconnect_multiplier() -> f64 {
    2.0
}
fn default_client_name() -> String {
    "embedctl".to_string()
}
fn default_baud() -> u32 {
    115_200
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            ack_timeout_ms: default_ack_timeout(),
            pairing_timeout_ms: default_pairing_timeout(),
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
            reconnect_multiplier: default_reconnect_multiplier(),
            reconnect_max_attempts: None,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            uuid: Uuid::new_v4(),
        }
    }
}

impl ControllerConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_millis(self.pairing_timeout_ms)
    }

    /// Backoff used between reconnect attempts
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::default()
            .with_initial_delay(Duration::from_millis(self.reconnect_initial_ms))
            .with_max_delay(Duration::from_millis(self.reconnect_max_ms))
            .with_backoff_multiplier(self.reconnect_multiplier)
            .with_max_attempts(self.reconnect_max_attempts)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(invalid("controller.heartbeat_interval_ms", "must be greater than 0"));
        }
        if self.heartbeat_timeout_ms <= self.heartbeat_interval_ms {
            return Err(invalid(
                "controller.heartbeat_timeout_ms",
                "must be longer than the heartbeat interval",
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(invalid("controller.connect_timeout_ms", "must be greater than 0"));
        }
        if self.ack_timeout_ms == 0 {
            return Err(invalid("controller.ack_timeout_ms", "must be greater than 0"));
        }
        if self.reconnect_multiplier < 1.0 {
            return Err(invalid("controller.reconnect_multiplier", "must be at least 1.0"));
        }
        if self.reconnect_initial_ms > self.reconnect_max_ms {
            return Err(invalid(
                "controller.reconnect_initial_ms",
                "must not exceed reconnect_max_ms",
            ));
        }
        Ok(())
    }
}

impl IdentityConfig {
    pub fn local_identity(&self) -> LocalIdentity {
        LocalIdentity::new(self.name.clone(), self.uuid)
    }
}

fn invalid(key: &str, reason: &str) -> EmbedError {
    EmbedError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

impl ConnectionDescriptor {
    pub fn new(name: impl Into<String>, kind: ConnectionKind) -> Self {
        Self {
            name: name.into(),
            extra_data: None,
            remote_uuid: None,
            kind,
        }
    }

    pub fn serial(name: impl Into<String>, port: impl Into<String>, baud: u32) -> Self {
        Self::new(
            name,
            ConnectionKind::Serial {
                port: port.into(),
                baud,
            },
        )
    }

    pub fn socket(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::new(
            name,
            ConnectionKind::Socket {
                host: host.into(),
                port,
            },
        )
    }

    pub fn simulator(name: impl Into<String>, script: Option<PathBuf>) -> Self {
        Self::new(name, ConnectionKind::Simulator { script })
    }

    /// Reject descriptors no transport could be built from
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("connection.name", "must not be empty"));
        }
        match &self.kind {
            ConnectionKind::Serial { port, baud } => {
                if port.trim().is_empty() {
                    return Err(invalid(&format!("{}.port", self.name), "must not be empty"));
                }
                if *baud == 0 {
                    return Err(invalid(&format!("{}.baud", self.name), "must be greater than 0"));
                }
            }
            ConnectionKind::Socket { host, port } => {
                if host.trim().is_empty() {
                    return Err(invalid(&format!("{}.host", self.name), "must not be empty"));
                }
                if *port == 0 {
                    return Err(invalid(&format!("{}.port", self.name), "cannot be 0"));
                }
            }
            ConnectionKind::Simulator { .. } => {}
        }
        Ok(())
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConnectionKind::Serial { port, baud } => write!(f, "{} (serial {port}@{baud})", self.name),
            ConnectionKind::Socket { host, port } => write!(f, "{} (tcp {host}:{port})", self.name),
            ConnectionKind::Simulator { .. } => write!(f, "{} (simulator)", self.name),
        }
    }
}

impl EmbedConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        let contents = std::fs::read_to_string(path).map_err(|e| {
            EmbedError::Config(ConfigError::FileError {
                reason: format!("Failed to read {}: {e}", path.display()),
            })
        })?;

        let config: EmbedConfig = toml::from_str(&contents).map_err(|e| {
            EmbedError::Config(ConfigError::FileError {
                reason: format!("Failed to parse {}: {e}", path.display()),
            })
        })?;

        info!("Configuration loaded from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("Saving configuration to: {}", path.display());

        let contents = toml::to_string_pretty(self)
            .map_err(|e| EmbedError::config(format!("Failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EmbedError::Config(ConfigError::FileError {
                    reason: format!("Failed to create config directory: {e}"),
                })
            })?;
        }

        std::fs::write(path, contents).map_err(|e| {
            EmbedError::Config(ConfigError::FileError {
                reason: format!("Failed to write {}: {e}", path.display()),
            })
        })?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Paths searched by [`EmbedConfig::load_with_fallback`], in order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("embedctl.toml"), PathBuf::from(".embedctl.toml")];
        if let Some(config_dir) = Self::user_config_path() {
            paths.push(config_dir);
        }
        paths
    }

    /// Per-user configuration file
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("embedctl").join("config.toml"))
    }

    /// Load the first readable configuration, defaults when there is none
    pub fn load_with_fallback() -> Self {
        Self::load_with_source().0
    }

    /// Same as [`EmbedConfig::load_with_fallback`], also naming the file used
    pub fn load_with_source() -> (Self, Option<PathBuf>) {
        for config_path in Self::search_paths() {
            if config_path.exists() {
                match Self::load_from_file(&config_path) {
                    Ok(config) => {
                        info!("Using configuration from: {}", config_path.display());
                        return (config, Some(config_path));
                    }
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", config_path.display(), e);
                    }
                }
            }
        }

        info!("No configuration file found, using defaults");
        (Self::default(), None)
    }

    /// Override settings from `EMBEDCTL_*` environment variables
    pub fn merge_with_env(&mut self) {
        if let Ok(level) = std::env::var("EMBEDCTL_LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.logging.level = level,
                Err(e) => warn!("Ignoring EMBEDCTL_LOG_LEVEL: {e}"),
            }
        }

        if let Ok(interval) = std::env::var("EMBEDCTL_HEARTBEAT_MS") {
            match interval.parse::<u64>() {
                Ok(ms) => self.controller.heartbeat_interval_ms = ms,
                Err(_) => warn!("Ignoring EMBEDCTL_HEARTBEAT_MS={interval}"),
            }
        }

        if let Ok(name) = std::env::var("EMBEDCTL_CLIENT_NAME") {
            if !name.trim().is_empty() {
                self.identity.name = name;
            }
        }

        debug!("Configuration merged with environment variables");
    }

    pub fn validate(&self) -> Result<()> {
        self.controller.validate()?;

        if self.identity.name.trim().is_empty() {
            return Err(invalid("identity.name", "must not be empty"));
        }

        let mut names = HashSet::new();
        for connection in &self.connections {
            connection.validate()?;
            if !names.insert(connection.name.as_str()) {
                return Err(EmbedError::config(format!(
                    "Connection '{}' is defined more than once",
                    connection.name
                )));
            }
        }

        debug!("Configuration validation completed successfully");
        Ok(())
    }

    /// Look up a saved connection by name
    pub fn connection(&self, name: &str) -> Result<&ConnectionDescriptor> {
        self.connections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                EmbedError::Config(ConfigError::ConnectionNotFound {
                    name: name.to_string(),
                })
            })
    }

    /// Add a connection, replacing one with the same name
    pub fn set_connection(&mut self, connection: ConnectionDescriptor) {
        match self.connections.iter_mut().find(|c| c.name == connection.name) {
            Some(existing) => *existing = connection,
            None => self.connections.push(connection),
        }
    }

    /// Record the device uuid seen on a connection
    pub fn remember_remote_uuid(&mut self, name: &str, uuid: Uuid) -> Result<()> {
        let connection = self
            .connections
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                EmbedError::Config(ConfigError::ConnectionNotFound {
                    name: name.to_string(),
                })
            })?;
        connection.remote_uuid = Some(uuid);
        Ok(())
    }

    /// Record a device uuid directly in the file at `path`
    ///
    /// The file is read back first so environment overrides never end up in it.
    pub fn remember_remote_uuid_in_file<P: AsRef<Path>>(path: P, name: &str, uuid: Uuid) -> Result<()> {
        let path = path.as_ref();
        let mut config = Self::load_from_file(path)?;
        config.remember_remote_uuid(name, uuid)?;
        config.save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = EmbedConfig::default();
        assert_eq!(config.controller.heartbeat_interval_ms, 1500);
        assert_eq!(config.identity.name, "embedctl");
        assert!(config.connections.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = EmbedConfig::default();
        config.set_connection(ConnectionDescriptor::socket("bench", "10.0.0.5", 3333));
        config.set_connection(ConnectionDescriptor::serial("usb", "/dev/ttyUSB0", 115_200));

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EmbedConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(deserialized.connections, config.connections);
        assert_eq!(deserialized.identity, config.identity);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: EmbedConfig = toml::from_str(
            r#"
            [controller]
            heartbeat_interval_ms = 1000

            [[connections]]
            name = "lab"
            [connections.kind]
            type = "serial"
            port = "COM3"
            "#,
        )
        .unwrap();

        assert_eq!(config.controller.heartbeat_interval(), Duration::from_millis(1000));
        assert_eq!(config.controller.heartbeat_timeout_ms, 5000);
        assert_eq!(
            config.connection("lab").unwrap().kind,
            ConnectionKind::Serial {
                port: "COM3".to_string(),
                baud: 115_200
            }
        );
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = EmbedConfig::default();
        config.set_connection(ConnectionDescriptor::simulator("sim", None));
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded = EmbedConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.identity.uuid, config.identity.uuid);
        assert_eq!(loaded.connections, config.connections);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EmbedConfig::default();
        config.controller.heartbeat_timeout_ms = 1000;
        assert!(config.validate().is_err());

        let mut config = EmbedConfig::default();
        config.set_connection(ConnectionDescriptor::socket("bad", "", 3333));
        assert!(config.validate().is_err());

        let mut config = EmbedConfig::default();
        config.connections.push(ConnectionDescriptor::simulator("twice", None));
        config.connections.push(ConnectionDescriptor::simulator("twice", None));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(ConnectionDescriptor::serial("s", "", 9600).validate().is_err());
        assert!(ConnectionDescriptor::serial("s", "/dev/ttyACM0", 0).validate().is_err());
        assert!(ConnectionDescriptor::socket("t", "localhost", 0).validate().is_err());
        assert!(ConnectionDescriptor::socket("t", "localhost", 3333).validate().is_ok());
    }

    #[test]
    fn test_remember_remote_uuid() {
        let mut config = EmbedConfig::default();
        config.set_connection(ConnectionDescriptor::socket("bench", "localhost", 3333));
        let uuid = Uuid::new_v4();

        config.remember_remote_uuid("bench", uuid).unwrap();
        assert_eq!(config.connection("bench").unwrap().remote_uuid, Some(uuid));
        assert!(matches!(
            config.remember_remote_uuid("missing", uuid),
            Err(EmbedError::Config(ConfigError::ConnectionNotFound { .. }))
        ));
    }

    #[test]
    fn test_remember_in_file_keeps_file_settings() {
        let mut config = EmbedConfig::default();
        config.set_connection(ConnectionDescriptor::socket("bench", "localhost", 3333));
        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        // what the process runs with after EMBEDCTL_HEARTBEAT_MS=250
        let mut running = EmbedConfig::load_from_file(temp_file.path()).unwrap();
        running.controller.heartbeat_interval_ms = 250;

        let uuid = Uuid::new_v4();
        EmbedConfig::remember_remote_uuid_in_file(temp_file.path(), "bench", uuid).unwrap();

        let saved = EmbedConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(saved.connection("bench").unwrap().remote_uuid, Some(uuid));
        assert_eq!(
            saved.controller.heartbeat_interval_ms,
            config.controller.heartbeat_interval_ms
        );
        assert_ne!(saved.controller.heartbeat_interval_ms, running.controller.heartbeat_interval_ms);
        assert!(EmbedConfig::remember_remote_uuid_in_file(temp_file.path(), "missing", uuid).is_err());
    }

    #[test]
    fn test_reconnect_policy_from_config() {
        let controller = ControllerConfig {
            reconnect_initial_ms: 100,
            reconnect_max_ms: 1000,
            reconnect_max_attempts: Some(3),
            ..ControllerConfig::default()
        };
        let policy = controller.reconnect_policy();
        assert_eq!(policy.initial_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_millis(1000));
        assert!(!policy.should_retry(3));
    }
}

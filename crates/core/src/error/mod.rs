//! Unified error handling for embedctl
//!
//! Transport and codec failures never cross the listener boundary as errors;
//! the controller turns them into connection status changes. The types here
//! are what the library returns from setup calls and what gets logged.

use thiserror::Error;

pub mod retry;

/// Result type alias for all embedctl operations
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Central error type for all embedctl operations
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Transport-level failures, these trigger the reconnect policy
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Malformed or unexpected wire data, recoverable
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The device refused us, drives the pairing flow
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Heartbeat, acknowledgement or pairing timeouts
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Menu tree structure errors
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Transport-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Connection could not be opened
    #[error("Connection to {target} failed: {reason}")]
    ConnectFailed { target: String, reason: String },

    /// Serial device or host does not exist
    #[error("Device not found: {target}")]
    NotFound { target: String },

    /// Write attempted while the channel is closed
    #[error("Transport '{transport}' is not connected")]
    NotConnected { transport: String },

    /// Write failed on an open channel
    #[error("Write failed: {reason}")]
    WriteFailed { reason: String },

    /// Remote end went away
    #[error("Connection closed: {reason}")]
    Closed { reason: String },
}

/// Protocol communication errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame did not follow the start/protocol/tag/fields/end layout
    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    /// Message tag not known to this client
    #[error("Unknown message type: {tag}")]
    UnknownMessage { tag: String },

    /// Required field absent
    #[error("Message {tag} is missing field {field}")]
    MissingField { tag: String, field: &'static str },

    /// Field present but unparseable
    #[error("Invalid value for field {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    /// Item type that cannot travel over the wire
    #[error("Item {id} of type {kind} cannot be sent to a device")]
    UnsupportedItem { id: u16, kind: &'static str },

    /// Frame exceeded the maximum accepted length
    #[error("Frame too long: {size} bytes")]
    FrameTooLong { size: usize },

    /// Bootstrap finished while children were still waiting for their parent
    #[error("Parent {parent_id} never arrived for {count} item(s)")]
    OrphanedItems { parent_id: u16, count: usize },
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Device rejected our identity during the handshake
    #[error("Device rejected credentials for {name}")]
    InvalidCredentials { name: String },

    /// Device declined the pairing request
    #[error("Pairing rejected by device")]
    PairingRejected,
}

/// Timeout errors
#[derive(Error, Debug)]
pub enum TimeoutError {
    /// Nothing heard from the device in the heartbeat window
    #[error("No traffic from device for {millis}ms")]
    Heartbeat { millis: u64 },

    /// Acknowledgement never arrived
    #[error("No acknowledgement for correlation {correlation}")]
    Ack { correlation: String },

    /// Pairing exchange did not finish
    #[error("Pairing timed out after {millis}ms")]
    Pairing { millis: u64 },

    /// Transport connect took too long
    #[error("Connect timed out after {millis}ms")]
    Connect { millis: u64 },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration file error
    #[error("Configuration file error: {reason}")]
    FileError { reason: String },

    /// Named connection not present
    #[error("Connection not found: {name}")]
    ConnectionNotFound { name: String },

    /// Validation failed
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}

/// Menu tree errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Menu item {id} not found")]
    ItemNotFound { id: u16 },

    #[error("Item {id} is not a submenu")]
    NotASubMenu { id: u16 },

    #[error("Id {id} is reserved for the root menu")]
    ReservedId { id: u16 },

    #[error("Item {id} already belongs to submenu {existing}, cannot move under {requested}")]
    ParentMismatch {
        id: u16,
        existing: u16,
        requested: u16,
    },

    #[error("Item {id} is read only")]
    ReadOnly { id: u16 },

    #[error("Item {id} cannot be edited remotely")]
    NotEditable { id: u16 },

    #[error("Value '{value}' is not valid for item {id}")]
    InvalidValue { id: u16, value: String },
}

// Convenience constructors for common error cases
impl EmbedError {
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(ProtocolError::MalformedFrame {
            reason: message.into(),
        })
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(ConfigError::ValidationFailed {
            reason: message.into(),
        })
    }

    pub fn not_connected<S: Into<String>>(transport: S) -> Self {
        Self::Connection(ConnectionError::NotConnected {
            transport: transport.into(),
        })
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error should lead to a reconnect attempt
    pub fn is_retriable(&self) -> bool {
        match self {
            EmbedError::Connection(ConnectionError::NotFound { .. }) => true,
            EmbedError::Connection(_) => true,
            EmbedError::Timeout(TimeoutError::Heartbeat { .. }) => true,
            EmbedError::Timeout(TimeoutError::Connect { .. }) => true,
            EmbedError::Io(_) => true,
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            EmbedError::Connection(_) => "connection",
            EmbedError::Protocol(_) => "protocol",
            EmbedError::Auth(_) => "auth",
            EmbedError::Timeout(_) => "timeout",
            EmbedError::Config(_) => "config",
            EmbedError::Tree(_) => "tree",
            EmbedError::Io(_) => "io",
            EmbedError::Internal { .. } => "internal",
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            EmbedError::Connection(ConnectionError::ConnectFailed { target, .. }) => {
                format!("Unable to connect to {target}. Please check the connection settings.")
            }
            EmbedError::Auth(AuthError::InvalidCredentials { .. }) => {
                "The device does not trust this client yet. Pair with the device first."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<anyhow::Error> for EmbedError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

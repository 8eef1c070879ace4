//! # embedctl Core Library
//!
//! Shared pieces of the embedctl remote menu client: the menu model, the
//! tag/value wire protocol, connection identities, configuration and logging.
//!
//! ## Key Components
//!
//! - **Menu**: item definitions, values and the [`MenuTree`]
//! - **Protocol**: typed [`MenuCommand`]s and the streaming frame codec
//! - **Remote**: device identity and [`AuthStatus`]
//! - **Configuration**: controller timings, identity and saved connections
//!
//! Nothing in this crate performs I/O on a device; transports and the
//! controller live in `embedctl-client`.

pub mod config;
pub mod error;
pub mod logging;
pub mod menu;
pub mod protocol;
pub mod remote;

// Re-export commonly used types
pub use config::{ConnectionDescriptor, ConnectionKind, ControllerConfig, EmbedConfig};
pub use error::retry::ReconnectPolicy;
pub use error::{EmbedError, Result};
pub use logging::{LogFormat, LogLevel, LoggerBuilder, LoggingConfig};
pub use menu::{ItemKind, MenuItem, MenuItemBuilder, MenuState, MenuTree, MenuValue};
pub use protocol::{AckStatus, CorrelationId, FrameDecoder, MenuCommand};
pub use remote::{ApiPlatform, AuthStatus, LocalIdentity, RemoteInformation};

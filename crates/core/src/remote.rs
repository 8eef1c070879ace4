//! Identity of both ends of a connection and the connection status

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Platform a peer reports in its Join message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiPlatform {
    Arduino,
    RemoteApi,
    Arduino32,
    DotNet,
    JavaScript,
    Other(u16),
}

impl ApiPlatform {
    pub fn code(self) -> u16 {
        match self {
            ApiPlatform::Arduino => 0,
            ApiPlatform::RemoteApi => 1,
            ApiPlatform::Arduino32 => 2,
            ApiPlatform::DotNet => 3,
            ApiPlatform::JavaScript => 4,
            ApiPlatform::Other(code) => code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            0 => ApiPlatform::Arduino,
            1 => ApiPlatform::RemoteApi,
            2 => ApiPlatform::Arduino32,
            3 => ApiPlatform::DotNet,
            4 => ApiPlatform::JavaScript,
            other => ApiPlatform::Other(other),
        }
    }
}

impl fmt::Display for ApiPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiPlatform::Arduino => write!(f, "Arduino 8-bit"),
            ApiPlatform::RemoteApi => write!(f, "Remote API"),
            ApiPlatform::Arduino32 => write!(f, "Arduino 32-bit"),
            ApiPlatform::DotNet => write!(f, ".NET"),
            ApiPlatform::JavaScript => write!(f, "JavaScript"),
            ApiPlatform::Other(code) => write!(f, "platform {code}"),
        }
    }
}

/// Identity of the connected device, filled in from its Join message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInformation {
    pub name: String,
    pub uuid: Uuid,
    pub major: u16,
    pub minor: u16,
    pub platform: ApiPlatform,
    pub serial_number: u64,
}

impl RemoteInformation {
    /// Placeholder used until a device has identified itself
    pub fn not_connected() -> Self {
        Self {
            name: "Not Connected".to_string(),
            uuid: Uuid::nil(),
            major: 0,
            minor: 0,
            platform: ApiPlatform::Arduino,
            serial_number: 0,
        }
    }

    /// Build from the combined `major * 100 + minor` version the wire carries
    pub fn from_join(
        name: &str,
        uuid: Uuid,
        api_version: u16,
        platform: ApiPlatform,
        serial_number: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            uuid,
            major: api_version / 100,
            minor: api_version % 100,
            platform,
            serial_number,
        }
    }
}

impl fmt::Display for RemoteInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} V{}.{} ({}, S/N {})",
            self.name, self.major, self.minor, self.platform, self.serial_number
        )
    }
}

/// Lifecycle state of one remote connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    NotStarted,
    AwaitingConnection,
    EstablishingConnection,
    Authenticating,
    Bootstrapping,
    ConnectionReady,
    FailedAuth,
    ConnectionFailed,
}

impl AuthStatus {
    /// True while a transport connection is open
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            AuthStatus::EstablishingConnection
                | AuthStatus::Authenticating
                | AuthStatus::Bootstrapping
                | AuthStatus::ConnectionReady
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            AuthStatus::NotStarted => "Not started",
            AuthStatus::AwaitingConnection => "Awaiting connection",
            AuthStatus::EstablishingConnection => "Establishing connection",
            AuthStatus::Authenticating => "Authenticating",
            AuthStatus::Bootstrapping => "Receiving menu",
            AuthStatus::ConnectionReady => "Connected",
            AuthStatus::FailedAuth => "Authentication failed, pairing required",
            AuthStatus::ConnectionFailed => "Connection failed",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Who this client says it is in Join and pairing messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub name: String,
    pub uuid: Uuid,
}

impl LocalIdentity {
    pub fn new(name: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            name: name.into(),
            uuid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_split() {
        let info = RemoteInformation::from_join("dev", Uuid::nil(), 412, ApiPlatform::Arduino32, 9);
        assert_eq!(info.major, 4);
        assert_eq!(info.minor, 12);
        assert_eq!(info.to_string(), "dev V4.12 (Arduino 32-bit, S/N 9)");
    }

    #[test]
    fn test_platform_codes() {
        for code in 0..6 {
            assert_eq!(ApiPlatform::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_connected_states() {
        assert!(AuthStatus::ConnectionReady.is_connected());
        assert!(AuthStatus::Bootstrapping.is_connected());
        assert!(!AuthStatus::FailedAuth.is_connected());
        assert!(!AuthStatus::AwaitingConnection.is_connected());
    }
}

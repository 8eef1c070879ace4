//! Typed protocol messages

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::menu::{ItemKind, MenuItem, MenuValue};
use crate::remote::ApiPlatform;

/// Token linking an outgoing command to its acknowledgement
///
/// Rendered on the wire as eight lowercase hex digits. Zero means the
/// command carries no correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CorrelationId(pub u32);

impl CorrelationId {
    pub const NONE: CorrelationId = CorrelationId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn parse(text: &str) -> Option<Self> {
        u32::from_str_radix(text.trim(), 16).ok().map(CorrelationId)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Heartbeat sub-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatMode {
    Normal,
    /// First heartbeat after the connection opens
    Start,
    /// Peer is closing the connection
    End,
}

impl HeartbeatMode {
    pub fn code(self) -> u8 {
        match self {
            HeartbeatMode::Normal => 0,
            HeartbeatMode::Start => 1,
            HeartbeatMode::End => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HeartbeatMode::Normal),
            1 => Some(HeartbeatMode::Start),
            2 => Some(HeartbeatMode::End),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    Start,
    Complete,
}

/// Payload of a value change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeData {
    /// Relative change for integer based items
    Delta(i32),
    /// Absolute value in wire text form
    Absolute(String),
    /// Full replacement of a list item's rows
    List(Vec<String>),
}

impl ChangeData {
    pub fn type_code(&self) -> u8 {
        match self {
            ChangeData::Delta(_) => 0,
            ChangeData::Absolute(_) => 1,
            ChangeData::List(_) => 2,
        }
    }

    /// Absolute change carrying a value, lists become list changes
    pub fn from_value(value: &MenuValue) -> Self {
        match value {
            MenuValue::List(rows) => ChangeData::List(rows.clone()),
            other => ChangeData::Absolute(other.to_wire()),
        }
    }
}

/// Result a device reports for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    Success,
    ValueRangeWarning,
    InvalidCredentials,
    IdNotFound,
    UnknownError,
}

impl AckStatus {
    pub fn code(self) -> i32 {
        match self {
            AckStatus::Success => 0,
            AckStatus::ValueRangeWarning => 1,
            AckStatus::InvalidCredentials => 10000,
            AckStatus::IdNotFound => 10001,
            AckStatus::UnknownError => 10002,
        }
    }

    /// Codes this client does not know map to `UnknownError`
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => AckStatus::Success,
            1 => AckStatus::ValueRangeWarning,
            10000 => AckStatus::InvalidCredentials,
            10001 => AckStatus::IdNotFound,
            _ => AckStatus::UnknownError,
        }
    }

    pub fn is_error(self) -> bool {
        self.code() >= 10000
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AckStatus::Success => "SUCCESS",
            AckStatus::ValueRangeWarning => "VALUE_RANGE_WARNING",
            AckStatus::InvalidCredentials => "INVALID_CREDENTIALS",
            AckStatus::IdNotFound => "ID_NOT_FOUND",
            AckStatus::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Show,
    Hide,
    /// A button was pressed
    Action,
}

impl DialogMode {
    pub fn code(self) -> char {
        match self {
            DialogMode::Show => 'S',
            DialogMode::Hide => 'H',
            DialogMode::Action => 'A',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(DialogMode::Show),
            "H" => Some(DialogMode::Hide),
            "A" => Some(DialogMode::Action),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogButton {
    Accept,
    Cancel,
    Ok,
    Close,
    None,
}

impl DialogButton {
    pub fn code(self) -> u8 {
        match self {
            DialogButton::Accept => 0,
            DialogButton::Cancel => 1,
            DialogButton::Ok => 2,
            DialogButton::Close => 3,
            DialogButton::None => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DialogButton::Accept),
            1 => Some(DialogButton::Cancel),
            2 => Some(DialogButton::Ok),
            3 => Some(DialogButton::Close),
            4 => Some(DialogButton::None),
            _ => None,
        }
    }
}

/// Show, hide or act on a dialog displayed by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogCommand {
    pub mode: DialogMode,
    pub header: String,
    pub message: String,
    pub button1: DialogButton,
    pub button2: DialogButton,
    pub correlation: CorrelationId,
}

/// Every message the protocol knows
#[derive(Debug, Clone, PartialEq)]
pub enum MenuCommand {
    /// Handshake start, sent by both ends
    Join {
        name: String,
        uuid: Uuid,
        api_version: u16,
        platform: ApiPlatform,
        serial_number: u64,
    },
    Heartbeat {
        interval_ms: u32,
        mode: HeartbeatMode,
    },
    Bootstrap {
        phase: BootPhase,
    },
    /// One item of the tree during bootstrap, tag depends on the item type
    ///
    /// Build with [`MenuCommand::item_boot`] so the command survives a trip
    /// over the wire unchanged.
    ItemBoot {
        parent_id: u16,
        item: MenuItem,
        value: MenuValue,
    },
    Change {
        correlation: CorrelationId,
        item_id: u16,
        change: ChangeData,
    },
    Ack {
        correlation: CorrelationId,
        status: AckStatus,
    },
    Dialog(DialogCommand),
    PairingRequest {
        name: String,
        uuid: Uuid,
    },
    PairingResponse {
        accepted: bool,
    },
    /// Ask the device to resend item names for a locale
    NamesRequest {
        locale: String,
    },
}

impl MenuCommand {
    pub fn bootstrap_start() -> Self {
        MenuCommand::Bootstrap {
            phase: BootPhase::Start,
        }
    }

    pub fn bootstrap_complete() -> Self {
        MenuCommand::Bootstrap {
            phase: BootPhase::Complete,
        }
    }

    /// Boot message for an item, reduced to what the wire carries
    ///
    /// The function name never leaves the client. Actions and sub menus
    /// always boot with their default value.
    pub fn item_boot(parent_id: u16, mut item: MenuItem, value: MenuValue) -> Self {
        item.function_name = None;
        let value = match (&item.kind, value) {
            (ItemKind::Action | ItemKind::SubMenu, _) => item.default_value(),
            (ItemKind::RuntimeList, value @ MenuValue::List(_)) => value,
            (ItemKind::RuntimeList, _) => item.default_value(),
            (_, value) => value,
        };
        MenuCommand::ItemBoot {
            parent_id,
            item,
            value,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            MenuCommand::Join { .. } => "join",
            MenuCommand::Heartbeat { .. } => "heartbeat",
            MenuCommand::Bootstrap { .. } => "bootstrap",
            MenuCommand::ItemBoot { .. } => "item-boot",
            MenuCommand::Change { .. } => "change",
            MenuCommand::Ack { .. } => "ack",
            MenuCommand::Dialog(_) => "dialog",
            MenuCommand::PairingRequest { .. } => "pairing-request",
            MenuCommand::PairingResponse { .. } => "pairing-response",
            MenuCommand::NamesRequest { .. } => "names-request",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_display_and_parse() {
        let id = CorrelationId(0x1a2b);
        assert_eq!(id.to_string(), "00001a2b");
        assert_eq!(CorrelationId::parse("00001a2b"), Some(id));
        assert_eq!(CorrelationId::parse("zz"), None);
        assert!(CorrelationId::NONE.is_none());
    }

    #[test]
    fn test_ack_status_codes() {
        assert_eq!(AckStatus::from_code(0), AckStatus::Success);
        assert_eq!(AckStatus::from_code(10000), AckStatus::InvalidCredentials);
        assert_eq!(AckStatus::from_code(-7), AckStatus::UnknownError);
        assert!(AckStatus::IdNotFound.is_error());
        assert!(!AckStatus::ValueRangeWarning.is_error());
    }

    #[test]
    fn test_change_from_value() {
        assert_eq!(
            ChangeData::from_value(&MenuValue::Int(42)),
            ChangeData::Absolute("42".to_string())
        );
        assert_eq!(
            ChangeData::from_value(&MenuValue::List(vec!["a".into()])),
            ChangeData::List(vec!["a".into()])
        );
    }
}

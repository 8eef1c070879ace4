//! Tag/value frame codec
//!
//! A frame is `SOH`, the protocol id, a two character message tag, any number
//! of `KEY=VALUE|` fields and a closing `EOM` byte. Inside values `\`, `|` and
//! `=` are escaped with a backslash. Decoding works on partial input: bytes may
//! arrive split at any point and [`FrameDecoder`] buffers until a frame is
//! complete.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

use super::command::{
    AckStatus, BootPhase, ChangeData, CorrelationId, DialogButton, DialogCommand, DialogMode,
    HeartbeatMode, MenuCommand,
};
use super::fields::{
    CHOICE_KEYS, END_OF_MSG, ESCAPE, FIELD_TERMINATOR, KEY_VALUE_SEPARATOR, MAX_FRAME_LEN,
    PROTOCOL_TAG_VAL, START_OF_MSG, choice_key, key, tag,
};
use crate::error::ProtocolError;
use crate::menu::{
    AnalogInfo, BooleanNaming, EditItemType, ItemKind, MenuItem, MenuValue, ScrollChoiceMode,
};
use crate::remote::ApiPlatform;

/// Outcome of trying to decode one frame from the front of a buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A whole frame, `consumed` bytes can be dropped from the buffer
    Frame {
        command: MenuCommand,
        consumed: usize,
    },
    /// Need more bytes
    Incomplete,
    /// Bad data, drop `consumed` bytes and try again
    Corrupt {
        error: ProtocolError,
        consumed: usize,
    },
}

fn malformed(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::MalformedFrame {
        reason: reason.into(),
    }
}

struct FrameWriter {
    buf: BytesMut,
}

impl FrameWriter {
    fn new(tag: &str) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u8(START_OF_MSG);
        buf.put_u8(PROTOCOL_TAG_VAL);
        buf.put_slice(tag.as_bytes());
        Self { buf }
    }

    fn field(&mut self, key: &str, value: impl Display) -> &mut Self {
        let text = value.to_string();
        self.buf.put_slice(key.as_bytes());
        self.buf.put_u8(KEY_VALUE_SEPARATOR);
        for byte in text.bytes() {
            match byte {
                START_OF_MSG | END_OF_MSG => continue,
                ESCAPE | FIELD_TERMINATOR | KEY_VALUE_SEPARATOR => {
                    self.buf.put_u8(ESCAPE);
                    self.buf.put_u8(byte);
                }
                _ => self.buf.put_u8(byte),
            }
        }
        self.buf.put_u8(FIELD_TERMINATOR);
        self
    }

    fn flag(&mut self, key: &str, value: bool) -> &mut Self {
        self.field(key, u8::from(value))
    }

    fn choices(&mut self, values: &[String]) -> Result<&mut Self, ProtocolError> {
        if values.len() > CHOICE_KEYS.len() {
            return Err(ProtocolError::InvalidField {
                field: key::NO_OF_CHOICES,
                value: values.len().to_string(),
            });
        }
        self.field(key::NO_OF_CHOICES, values.len());
        for (index, value) in values.iter().enumerate() {
            if let Some(choice) = choice_key(index) {
                self.field(choice, value);
            }
        }
        Ok(self)
    }

    fn correlation(&mut self, correlation: CorrelationId) -> &mut Self {
        self.field(key::CORRELATION, correlation)
    }

    fn finish(mut self) -> Bytes {
        self.buf.put_u8(END_OF_MSG);
        self.buf.freeze()
    }
}

/// Message tag used to bootstrap an item, `None` for designer-only items
pub fn boot_tag(kind: &ItemKind) -> Option<&'static str> {
    match kind {
        ItemKind::Analog(_) => Some(tag::ANALOG_BOOT),
        ItemKind::Boolean { .. } => Some(tag::BOOLEAN_BOOT),
        ItemKind::Enum { .. } => Some(tag::ENUM_BOOT),
        ItemKind::Text { .. } => Some(tag::TEXT_BOOT),
        ItemKind::Float { .. } => Some(tag::FLOAT_BOOT),
        ItemKind::Action => Some(tag::ACTION_BOOT),
        ItemKind::SubMenu => Some(tag::SUBMENU_BOOT),
        ItemKind::Remote { .. } => Some(tag::REMOTE_BOOT),
        ItemKind::ScrollChoice { .. } => Some(tag::SCROLL_CHOICE_BOOT),
        ItemKind::Rgb32 { .. } => Some(tag::RGB32_BOOT),
        ItemKind::RuntimeList => Some(tag::RUNTIME_LIST_BOOT),
        ItemKind::LargeNumber { .. } => Some(tag::LARGE_NUMBER_BOOT),
        ItemKind::CustomBuilder { .. } => None,
    }
}

/// Serialize a command into one frame
///
/// Output depends only on the command. Fails for items that cannot travel
/// over the wire and for choice lists longer than the key space allows.
pub fn encode(command: &MenuCommand) -> Result<Bytes, ProtocolError> {
    let writer = match command {
        MenuCommand::Join {
            name,
            uuid,
            api_version,
            platform,
            serial_number,
        } => {
            let mut w = FrameWriter::new(tag::JOIN);
            w.field(key::NAME, name)
                .field(key::UUID, uuid)
                .field(key::VERSION, api_version)
                .field(key::PLATFORM, platform.code())
                .field(key::SERIAL_NO, serial_number);
            w
        }
        MenuCommand::Heartbeat { interval_ms, mode } => {
            let mut w = FrameWriter::new(tag::HEARTBEAT);
            w.field(key::HB_INTERVAL, interval_ms)
                .field(key::HB_MODE, mode.code());
            w
        }
        MenuCommand::Bootstrap { phase } => {
            let mut w = FrameWriter::new(tag::BOOTSTRAP);
            let text = match phase {
                BootPhase::Start => "START",
                BootPhase::Complete => "END",
            };
            w.field(key::BOOT_TYPE, text);
            w
        }
        MenuCommand::ItemBoot {
            parent_id,
            item,
            value,
        } => encode_item_boot(*parent_id, item, value)?,
        MenuCommand::Change {
            correlation,
            item_id,
            change,
        } => {
            let mut w = FrameWriter::new(tag::CHANGE);
            w.correlation(*correlation)
                .field(key::ID, item_id)
                .field(key::CHANGE_TYPE, change.type_code());
            match change {
                ChangeData::Delta(delta) => {
                    w.field(key::CURRENT_VAL, delta);
                }
                ChangeData::Absolute(text) => {
                    w.field(key::CURRENT_VAL, text);
                }
                ChangeData::List(rows) => {
                    w.choices(rows)?;
                }
            }
            w
        }
        MenuCommand::Ack {
            correlation,
            status,
        } => {
            let mut w = FrameWriter::new(tag::ACK);
            w.correlation(*correlation)
                .field(key::ACK_STATUS, status.code());
            w
        }
        MenuCommand::Dialog(dialog) => {
            let mut w = FrameWriter::new(tag::DIALOG);
            w.field(key::DIALOG_MODE, dialog.mode.code())
                .field(key::HEADER, &dialog.header)
                .field(key::BUFFER, &dialog.message)
                .field(key::BUTTON1, dialog.button1.code())
                .field(key::BUTTON2, dialog.button2.code())
                .correlation(dialog.correlation);
            w
        }
        MenuCommand::PairingRequest { name, uuid } => {
            let mut w = FrameWriter::new(tag::PAIRING_REQUEST);
            w.field(key::NAME, name).field(key::UUID, uuid);
            w
        }
        MenuCommand::PairingResponse { accepted } => {
            let status = if *accepted {
                AckStatus::Success
            } else {
                AckStatus::InvalidCredentials
            };
            let mut w = FrameWriter::new(tag::PAIRING_RESPONSE);
            w.field(key::ACK_STATUS, status.code());
            w
        }
        MenuCommand::NamesRequest { locale } => {
            let mut w = FrameWriter::new(tag::NAMES_REQUEST);
            w.field(key::LOCALE, locale);
            w
        }
    };
    Ok(writer.finish())
}

fn encode_item_boot(
    parent_id: u16,
    item: &MenuItem,
    value: &MenuValue,
) -> Result<FrameWriter, ProtocolError> {
    let unsupported = || ProtocolError::UnsupportedItem {
        id: item.id,
        kind: item.kind.name(),
    };
    let mut w = FrameWriter::new(boot_tag(&item.kind).ok_or_else(unsupported)?);
    w.field(key::PARENT_ID, parent_id)
        .field(key::ID, item.id)
        .field(key::EEPROM, item.eeprom_address)
        .field(key::NAME, &item.name)
        .flag(key::READ_ONLY, item.read_only)
        .flag(key::VISIBLE, item.visible);

    match &item.kind {
        ItemKind::Analog(info) => {
            w.field(key::ANALOG_MAX, info.max)
                .field(key::ANALOG_OFFSET, info.offset)
                .field(key::ANALOG_DIVISOR, info.divisor)
                .field(key::ANALOG_UNIT, &info.unit);
        }
        ItemKind::Boolean { naming } => {
            w.field(key::BOOLEAN_NAMING, naming.code());
        }
        ItemKind::Enum { choices } => {
            w.choices(choices)?;
        }
        ItemKind::Text {
            max_length,
            edit_type,
        } => {
            w.field(key::MAX_LENGTH, max_length)
                .field(key::EDIT_TYPE, edit_type.code());
        }
        ItemKind::Float { decimal_places } => {
            w.field(key::DECIMAL_PLACES, decimal_places);
        }
        ItemKind::Action | ItemKind::SubMenu => {}
        ItemKind::Remote { remote_no } => {
            w.field(key::REMOTE_NO, remote_no);
        }
        ItemKind::ScrollChoice {
            item_width,
            num_entries,
            mode,
        } => {
            w.field(key::WIDTH, item_width)
                .field(key::NO_OF_CHOICES, num_entries)
                .field(key::EDIT_TYPE, mode.code());
        }
        ItemKind::Rgb32 { include_alpha } => {
            w.flag(key::ALPHA, *include_alpha);
        }
        ItemKind::RuntimeList => {
            let rows = match value {
                MenuValue::List(rows) => rows.as_slice(),
                _ => &[],
            };
            w.choices(rows)?;
        }
        ItemKind::LargeNumber {
            digits,
            decimal_places,
            negative_allowed,
        } => {
            w.field(key::MAX_LENGTH, digits)
                .field(key::DECIMAL_PLACES, decimal_places)
                .flag(key::NEGATIVE_ALLOWED, *negative_allowed);
        }
        ItemKind::CustomBuilder { .. } => return Err(unsupported()),
    }

    if carries_current_value(&item.kind) {
        w.field(key::CURRENT_VAL, value.to_wire());
    }
    Ok(w)
}

fn carries_current_value(kind: &ItemKind) -> bool {
    !matches!(
        kind,
        ItemKind::Action | ItemKind::SubMenu | ItemKind::RuntimeList
    )
}

/// Try to decode one frame from the start of `buf`
pub fn decode_frame(buf: &[u8]) -> Decoded {
    let Some(start) = buf.iter().position(|b| *b == START_OF_MSG) else {
        if buf.is_empty() {
            return Decoded::Incomplete;
        }
        return Decoded::Corrupt {
            error: malformed(format!("{} byte(s) outside of any frame", buf.len())),
            consumed: buf.len(),
        };
    };
    if start > 0 {
        return Decoded::Corrupt {
            error: malformed(format!("{start} byte(s) before start of message")),
            consumed: start,
        };
    }
    if buf.len() < 2 {
        return Decoded::Incomplete;
    }
    if buf[1] != PROTOCOL_TAG_VAL {
        return Decoded::Corrupt {
            error: malformed(format!("unsupported protocol {:#04x}", buf[1])),
            consumed: 1,
        };
    }

    let mut end = None;
    let mut i = 2;
    while i < buf.len() {
        match buf[i] {
            ESCAPE => i += 2,
            END_OF_MSG => {
                end = Some(i);
                break;
            }
            START_OF_MSG => {
                return Decoded::Corrupt {
                    error: malformed("frame interrupted by a new start of message"),
                    consumed: i,
                };
            }
            _ => i += 1,
        }
    }

    let Some(end) = end else {
        if buf.len() > MAX_FRAME_LEN {
            return Decoded::Corrupt {
                error: ProtocolError::FrameTooLong { size: buf.len() },
                consumed: buf.len(),
            };
        }
        return Decoded::Incomplete;
    };

    let consumed = end + 1;
    if consumed > MAX_FRAME_LEN {
        return Decoded::Corrupt {
            error: ProtocolError::FrameTooLong { size: consumed },
            consumed,
        };
    }
    match parse_body(&buf[2..end]) {
        Ok(command) => Decoded::Frame { command, consumed },
        Err(error) => Decoded::Corrupt { error, consumed },
    }
}

/// Field map of one frame with typed accessors
struct Fields<'a> {
    tag: &'a str,
    values: HashMap<String, String>,
}

impl<'a> Fields<'a> {
    fn parse(tag: &'a str, data: &[u8]) -> Result<Self, ProtocolError> {
        let mut values = HashMap::new();
        let mut pos = 0;
        while pos < data.len() {
            let key_end = data[pos..]
                .iter()
                .position(|b| *b == KEY_VALUE_SEPARATOR)
                .map(|offset| pos + offset)
                .ok_or_else(|| malformed(format!("field without '=' in {tag}")))?;
            let key = std::str::from_utf8(&data[pos..key_end])
                .map_err(|_| malformed(format!("non UTF-8 key in {tag}")))?
                .to_string();

            let mut value = Vec::new();
            let mut i = key_end + 1;
            while i < data.len() {
                match data[i] {
                    ESCAPE if i + 1 < data.len() => {
                        value.push(data[i + 1]);
                        i += 2;
                    }
                    FIELD_TERMINATOR => {
                        i += 1;
                        break;
                    }
                    byte => {
                        value.push(byte);
                        i += 1;
                    }
                }
            }
            pos = i;

            let value = String::from_utf8(value)
                .map_err(|_| malformed(format!("non UTF-8 value for {key} in {tag}")))?;
            values.insert(key, value);
        }
        Ok(Self { tag, values })
    }

    fn opt_text(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn text(&self, key: &'static str) -> Result<&str, ProtocolError> {
        self.opt_text(key).ok_or_else(|| ProtocolError::MissingField {
            tag: self.tag.to_string(),
            field: key,
        })
    }

    fn text_or(&self, key: &str) -> String {
        self.opt_text(key).unwrap_or_default().to_string()
    }

    fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ProtocolError> {
        raw.trim().parse().map_err(|_| ProtocolError::InvalidField {
            field: key,
            value: raw.to_string(),
        })
    }

    fn number<T: FromStr>(&self, key: &'static str) -> Result<T, ProtocolError> {
        Self::parse_number(key, self.text(key)?)
    }

    fn number_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ProtocolError> {
        match self.opt_text(key) {
            Some(raw) => Self::parse_number(key, raw),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ProtocolError> {
        match self.opt_text(key).map(str::trim) {
            None => Ok(default),
            Some("1") => Ok(true),
            Some("0") => Ok(false),
            Some(other) => Err(ProtocolError::InvalidField {
                field: key,
                value: other.to_string(),
            }),
        }
    }

    fn uuid(&self, key: &'static str) -> Result<Uuid, ProtocolError> {
        let raw = self.text(key)?;
        Uuid::parse_str(raw.trim()).map_err(|_| ProtocolError::InvalidField {
            field: key,
            value: raw.to_string(),
        })
    }

    fn correlation(&self) -> Result<CorrelationId, ProtocolError> {
        match self.opt_text(key::CORRELATION) {
            None => Ok(CorrelationId::NONE),
            Some(raw) => CorrelationId::parse(raw).ok_or_else(|| ProtocolError::InvalidField {
                field: key::CORRELATION,
                value: raw.to_string(),
            }),
        }
    }

    fn coded<T>(
        &self,
        key: &'static str,
        default: u8,
        from_code: impl Fn(u8) -> Option<T>,
    ) -> Result<T, ProtocolError> {
        let code = self.number_or(key, default)?;
        from_code(code).ok_or_else(|| ProtocolError::InvalidField {
            field: key,
            value: code.to_string(),
        })
    }

    fn choices(&self) -> Result<Vec<String>, ProtocolError> {
        let count: usize = self.number_or(key::NO_OF_CHOICES, 0)?;
        if count > CHOICE_KEYS.len() {
            return Err(ProtocolError::InvalidField {
                field: key::NO_OF_CHOICES,
                value: count.to_string(),
            });
        }
        (0..count)
            .map(|index| {
                let choice = choice_key(index).unwrap_or(key::NO_OF_CHOICES);
                self.values
                    .get(choice)
                    .cloned()
                    .ok_or_else(|| ProtocolError::MissingField {
                        tag: self.tag.to_string(),
                        field: choice,
                    })
            })
            .collect()
    }
}

fn parse_body(body: &[u8]) -> Result<MenuCommand, ProtocolError> {
    if body.len() < 2 || !body[..2].is_ascii() {
        return Err(malformed("missing message type"));
    }
    let tag_text = std::str::from_utf8(&body[..2]).map_err(|_| malformed("bad message type"))?;
    let fields = Fields::parse(tag_text, &body[2..])?;

    match tag_text {
        tag::JOIN => Ok(MenuCommand::Join {
            name: fields.text(key::NAME)?.to_string(),
            uuid: fields.uuid(key::UUID)?,
            api_version: fields.number_or(key::VERSION, 0)?,
            platform: ApiPlatform::from_code(fields.number_or(key::PLATFORM, 0)?),
            serial_number: fields.number_or(key::SERIAL_NO, 0)?,
        }),
        tag::HEARTBEAT => Ok(MenuCommand::Heartbeat {
            interval_ms: fields.number_or(key::HB_INTERVAL, 1500)?,
            mode: fields.coded(key::HB_MODE, 0, HeartbeatMode::from_code)?,
        }),
        tag::BOOTSTRAP => {
            let phase = match fields.text(key::BOOT_TYPE)?.trim() {
                "START" => BootPhase::Start,
                "END" => BootPhase::Complete,
                other => {
                    return Err(ProtocolError::InvalidField {
                        field: key::BOOT_TYPE,
                        value: other.to_string(),
                    });
                }
            };
            Ok(MenuCommand::Bootstrap { phase })
        }
        tag::CHANGE => {
            let change = match fields.number::<u8>(key::CHANGE_TYPE)? {
                0 => ChangeData::Delta(fields.number(key::CURRENT_VAL)?),
                1 => ChangeData::Absolute(fields.text(key::CURRENT_VAL)?.to_string()),
                2 => ChangeData::List(fields.choices()?),
                other => {
                    return Err(ProtocolError::InvalidField {
                        field: key::CHANGE_TYPE,
                        value: other.to_string(),
                    });
                }
            };
            Ok(MenuCommand::Change {
                correlation: fields.correlation()?,
                item_id: fields.number(key::ID)?,
                change,
            })
        }
        tag::ACK => Ok(MenuCommand::Ack {
            correlation: fields.correlation()?,
            status: AckStatus::from_code(fields.number(key::ACK_STATUS)?),
        }),
        tag::DIALOG => {
            let raw_mode = fields.text(key::DIALOG_MODE)?;
            let mode =
                DialogMode::from_code(raw_mode.trim()).ok_or_else(|| ProtocolError::InvalidField {
                    field: key::DIALOG_MODE,
                    value: raw_mode.to_string(),
                })?;
            Ok(MenuCommand::Dialog(DialogCommand {
                mode,
                header: fields.text_or(key::HEADER),
                message: fields.text_or(key::BUFFER),
                button1: fields.coded(key::BUTTON1, 4, DialogButton::from_code)?,
                button2: fields.coded(key::BUTTON2, 4, DialogButton::from_code)?,
                correlation: fields.correlation()?,
            }))
        }
        tag::PAIRING_REQUEST => Ok(MenuCommand::PairingRequest {
            name: fields.text(key::NAME)?.to_string(),
            uuid: fields.uuid(key::UUID)?,
        }),
        tag::PAIRING_RESPONSE => Ok(MenuCommand::PairingResponse {
            accepted: !AckStatus::from_code(fields.number_or(key::ACK_STATUS, 0)?).is_error(),
        }),
        tag::NAMES_REQUEST => Ok(MenuCommand::NamesRequest {
            locale: fields.text(key::LOCALE)?.to_string(),
        }),
        other => match parse_item_kind(other, &fields)? {
            Some(kind) => parse_item_boot(kind, &fields),
            None => Err(ProtocolError::UnknownMessage {
                tag: other.to_string(),
            }),
        },
    }
}

fn parse_item_kind(tag_text: &str, fields: &Fields<'_>) -> Result<Option<ItemKind>, ProtocolError> {
    let kind = match tag_text {
        tag::ANALOG_BOOT => ItemKind::Analog(AnalogInfo {
            max: fields.number_or(key::ANALOG_MAX, 0)?,
            offset: fields.number_or(key::ANALOG_OFFSET, 0)?,
            divisor: fields.number_or(key::ANALOG_DIVISOR, 1)?,
            unit: fields.text_or(key::ANALOG_UNIT),
        }),
        tag::BOOLEAN_BOOT => ItemKind::Boolean {
            naming: fields.coded(key::BOOLEAN_NAMING, 0, BooleanNaming::from_code)?,
        },
        tag::ENUM_BOOT => ItemKind::Enum {
            choices: fields.choices()?,
        },
        tag::TEXT_BOOT => ItemKind::Text {
            max_length: fields.number_or(key::MAX_LENGTH, 0)?,
            edit_type: fields.coded(key::EDIT_TYPE, 0, EditItemType::from_code)?,
        },
        tag::FLOAT_BOOT => ItemKind::Float {
            decimal_places: fields.number_or(key::DECIMAL_PLACES, 0)?,
        },
        tag::ACTION_BOOT => ItemKind::Action,
        tag::SUBMENU_BOOT => ItemKind::SubMenu,
        tag::REMOTE_BOOT => ItemKind::Remote {
            remote_no: fields.number_or(key::REMOTE_NO, 0)?,
        },
        tag::SCROLL_CHOICE_BOOT => ItemKind::ScrollChoice {
            item_width: fields.number_or(key::WIDTH, 0)?,
            num_entries: fields.number_or(key::NO_OF_CHOICES, 0)?,
            mode: fields.coded(key::EDIT_TYPE, 0, ScrollChoiceMode::from_code)?,
        },
        tag::RGB32_BOOT => ItemKind::Rgb32 {
            include_alpha: fields.flag(key::ALPHA, false)?,
        },
        tag::RUNTIME_LIST_BOOT => ItemKind::RuntimeList,
        tag::LARGE_NUMBER_BOOT => ItemKind::LargeNumber {
            digits: fields.number_or(key::MAX_LENGTH, 12)?,
            decimal_places: fields.number_or(key::DECIMAL_PLACES, 0)?,
            negative_allowed: fields.flag(key::NEGATIVE_ALLOWED, false)?,
        },
        _ => return Ok(None),
    };
    Ok(Some(kind))
}

fn parse_item_boot(kind: ItemKind, fields: &Fields<'_>) -> Result<MenuCommand, ProtocolError> {
    let item = MenuItem {
        id: fields.number(key::ID)?,
        name: fields.text(key::NAME)?.to_string(),
        eeprom_address: fields.number_or(key::EEPROM, -1)?,
        function_name: None,
        read_only: fields.flag(key::READ_ONLY, false)?,
        visible: fields.flag(key::VISIBLE, true)?,
        kind,
    };

    let value = match &item.kind {
        ItemKind::RuntimeList => MenuValue::List(fields.choices()?),
        kind if carries_current_value(kind) => match fields.opt_text(key::CURRENT_VAL) {
            Some(raw) => {
                MenuValue::parse_for(kind, raw).ok_or_else(|| ProtocolError::InvalidField {
                    field: key::CURRENT_VAL,
                    value: raw.to_string(),
                })?
            }
            None => item.default_value(),
        },
        _ => item.default_value(),
    };

    Ok(MenuCommand::ItemBoot {
        parent_id: fields.number_or(key::PARENT_ID, 0)?,
        item,
        value,
    })
}

/// Streaming decoder that buffers partial frames between reads
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Append received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next decoded command, `None` once the buffer holds no complete frame
    ///
    /// Corrupt frames are dropped from the buffer and reported as errors;
    /// decoding carries on with the following bytes.
    pub fn next_command(&mut self) -> Option<Result<MenuCommand, ProtocolError>> {
        match decode_frame(&self.buffer) {
            Decoded::Incomplete => None,
            Decoded::Frame { command, consumed } => {
                self.buffer.advance(consumed);
                Some(Ok(command))
            }
            Decoded::Corrupt { error, consumed } => {
                self.buffer.advance(consumed);
                Some(Err(error))
            }
        }
    }

    /// Append a chunk and drain everything that is now decodable
    pub fn decode(&mut self, data: &[u8]) -> Vec<Result<MenuCommand, ProtocolError>> {
        self.extend(data);
        std::iter::from_fn(|| self.next_command()).collect()
    }

    /// Bytes waiting for the rest of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

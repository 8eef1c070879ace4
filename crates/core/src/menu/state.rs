//! Menu item values and per-item state

use serde::{Deserialize, Serialize};
use std::fmt;

use super::item::{ItemKind, MenuItem};

/// Current value of a menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MenuValue {
    Int(i32),
    Bool(bool),
    Text(String),
    Float(f32),
    /// Fixed-digit decimal kept in its textual form
    Decimal(String),
    Color(RgbColor),
    Scroll(ScrollPosition),
    List(Vec<String>),
}

/// 32-bit colour with alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor {
        red: 0,
        green: 0,
        blue: 0,
        alpha: 0xff,
    };

    /// Parse `#RRGGBB` or `#RRGGBBAA`
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let alpha = if hex.len() == 8 { byte(6)? } else { 0xff };
        Some(Self {
            red: byte(0)?,
            green: byte(2)?,
            blue: byte(4)?,
            alpha,
        })
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

/// Selected entry of a scroll choice item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub position: i32,
    pub text: String,
}

impl ScrollPosition {
    /// Parse the `position-text` form
    pub fn parse(text: &str) -> Option<Self> {
        let (pos, rest) = match text.find('-') {
            // a leading '-' belongs to the number
            Some(0) => match text[1..].find('-') {
                Some(i) => (&text[..i + 1], &text[i + 2..]),
                None => (text, ""),
            },
            Some(i) => (&text[..i], &text[i + 1..]),
            None => (text, ""),
        };
        Some(Self {
            position: pos.trim().parse().ok()?,
            text: rest.to_string(),
        })
    }
}

impl fmt::Display for ScrollPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.position, self.text)
    }
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next().unwrap_or("0");
    !whole.is_empty()
        && !fraction.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "1" | "true" | "TRUE" | "Y" | "y" => Some(true),
        "0" | "false" | "FALSE" | "N" | "n" => Some(false),
        _ => None,
    }
}

impl MenuValue {
    /// Convert a wire string into the value type the item expects
    pub fn parse_for(kind: &ItemKind, text: &str) -> Option<MenuValue> {
        match kind {
            ItemKind::Analog(_) | ItemKind::Enum { .. } => text.trim().parse().ok().map(MenuValue::Int),
            ItemKind::Boolean { .. } | ItemKind::Action | ItemKind::SubMenu => {
                parse_bool(text).map(MenuValue::Bool)
            }
            ItemKind::Text { .. } | ItemKind::Remote { .. } | ItemKind::CustomBuilder { .. } => {
                Some(MenuValue::Text(text.to_string()))
            }
            ItemKind::Float { .. } => text.trim().parse().ok().map(MenuValue::Float),
            ItemKind::LargeNumber { .. } => {
                is_decimal(text.trim()).then(|| MenuValue::Decimal(text.trim().to_string()))
            }
            ItemKind::Rgb32 { .. } => RgbColor::parse(text.trim()).map(MenuValue::Color),
            ItemKind::ScrollChoice { .. } => ScrollPosition::parse(text).map(MenuValue::Scroll),
            ItemKind::RuntimeList => Some(MenuValue::List(vec![text.to_string()])),
        }
    }

    /// Textual wire form; lists are joined with newlines
    pub fn to_wire(&self) -> String {
        match self {
            MenuValue::Int(v) => v.to_string(),
            MenuValue::Bool(v) => String::from(if *v { "1" } else { "0" }),
            MenuValue::Text(v) | MenuValue::Decimal(v) => v.clone(),
            MenuValue::Float(v) => v.to_string(),
            MenuValue::Color(c) => c.to_string(),
            MenuValue::Scroll(s) => s.to_string(),
            MenuValue::List(rows) => rows.join("\n"),
        }
    }

    /// Apply an integer delta, clamped to the item's range
    pub fn apply_delta(&self, kind: &ItemKind, delta: i32) -> Option<MenuValue> {
        match (kind, self) {
            (ItemKind::Analog(info), MenuValue::Int(v)) => {
                Some(MenuValue::Int(v.saturating_add(delta).clamp(0, info.max.max(0))))
            }
            (ItemKind::Enum { choices }, MenuValue::Int(v)) => {
                let last = (choices.len() as i32 - 1).max(0);
                Some(MenuValue::Int(v.saturating_add(delta).clamp(0, last)))
            }
            (ItemKind::ScrollChoice { num_entries, .. }, MenuValue::Scroll(pos)) => {
                let last = (*num_entries as i32 - 1).max(0);
                Some(MenuValue::Scroll(ScrollPosition {
                    position: pos.position.saturating_add(delta).clamp(0, last),
                    text: String::new(),
                }))
            }
            _ => None,
        }
    }

    /// Whether this value has the right type and range for the item
    pub fn fits(&self, item: &MenuItem) -> bool {
        match (&item.kind, self) {
            (ItemKind::Analog(info), MenuValue::Int(v)) => (0..=info.max).contains(v),
            (ItemKind::Enum { choices }, MenuValue::Int(v)) => {
                *v >= 0 && (*v as usize) < choices.len()
            }
            (ItemKind::Boolean { .. } | ItemKind::Action, MenuValue::Bool(_)) => true,
            (ItemKind::Text { max_length, .. }, MenuValue::Text(t)) => {
                t.chars().count() <= *max_length as usize
            }
            (ItemKind::Remote { .. }, MenuValue::Text(_)) => true,
            (ItemKind::LargeNumber { negative_allowed, .. }, MenuValue::Decimal(d)) => {
                is_decimal(d) && (*negative_allowed || !d.starts_with('-'))
            }
            (ItemKind::Rgb32 { .. }, MenuValue::Color(_)) => true,
            (ItemKind::ScrollChoice { num_entries, .. }, MenuValue::Scroll(s)) => {
                s.position >= 0 && s.position < *num_entries as i32
            }
            (ItemKind::RuntimeList, MenuValue::List(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MenuValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuValue::List(rows) => write!(f, "[{}]", rows.join(", ")),
            other => f.write_str(&other.to_wire()),
        }
    }
}

/// Value of an item plus the flags display layers use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuState {
    pub value: MenuValue,
    /// Dirty since it was last displayed
    pub changed: bool,
    pub active: bool,
}

impl MenuState {
    pub fn new(value: MenuValue) -> Self {
        Self {
            value,
            changed: false,
            active: false,
        }
    }

    pub fn changed(value: MenuValue) -> Self {
        Self {
            value,
            changed: true,
            active: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::item::{AnalogInfo, MenuItemBuilder, ScrollChoiceMode};

    #[test]
    fn test_color_parse_and_display() {
        let color = RgbColor::parse("#FF8000").unwrap();
        assert_eq!(color.alpha, 0xff);
        assert_eq!(color.to_string(), "#FF8000FF");
        assert_eq!(RgbColor::parse("#01020304").unwrap().alpha, 4);
        assert!(RgbColor::parse("FF8000").is_none());
        assert!(RgbColor::parse("#FF80").is_none());
    }

    #[test]
    fn test_scroll_position_parse() {
        let pos = ScrollPosition::parse("3-Item-3").unwrap();
        assert_eq!(pos.position, 3);
        assert_eq!(pos.text, "Item-3");
        assert_eq!(pos.to_string(), "3-Item-3");
        assert_eq!(ScrollPosition::parse("-1-none").unwrap().position, -1);
        assert_eq!(ScrollPosition::parse("7").unwrap().text, "");
        assert!(ScrollPosition::parse("x-y").is_none());
    }

    #[test]
    fn test_parse_for_item_types() {
        let analog = ItemKind::Analog(AnalogInfo::default());
        assert_eq!(MenuValue::parse_for(&analog, "42"), Some(MenuValue::Int(42)));
        assert_eq!(MenuValue::parse_for(&analog, "x"), None);

        let large = ItemKind::LargeNumber {
            digits: 8,
            decimal_places: 2,
            negative_allowed: true,
        };
        assert_eq!(
            MenuValue::parse_for(&large, "-123.45"),
            Some(MenuValue::Decimal("-123.45".to_string()))
        );
        assert_eq!(MenuValue::parse_for(&large, "1.2.3"), None);

        let boolean = ItemKind::Boolean {
            naming: crate::menu::item::BooleanNaming::YesNo,
        };
        assert_eq!(MenuValue::parse_for(&boolean, "1"), Some(MenuValue::Bool(true)));
    }

    #[test]
    fn test_delta_is_clamped() {
        let kind = ItemKind::Analog(AnalogInfo {
            max: 10,
            ..AnalogInfo::default()
        });
        assert_eq!(
            MenuValue::Int(8).apply_delta(&kind, 5),
            Some(MenuValue::Int(10))
        );
        assert_eq!(
            MenuValue::Int(2).apply_delta(&kind, -5),
            Some(MenuValue::Int(0))
        );
        assert_eq!(MenuValue::Text("a".into()).apply_delta(&kind, 1), None);
    }

    #[test]
    fn test_fits_checks_range() {
        let item = MenuItemBuilder::enumeration(1, "Mode", ["A", "B"]).build();
        assert!(MenuValue::Int(1).fits(&item));
        assert!(!MenuValue::Int(2).fits(&item));
        assert!(!MenuValue::Bool(true).fits(&item));

        let scroll =
            MenuItemBuilder::scroll_choice(2, "Pick", 10, 3, ScrollChoiceMode::ArrayInRam).build();
        assert!(
            MenuValue::Scroll(ScrollPosition {
                position: 2,
                text: String::new()
            })
            .fits(&scroll)
        );
    }
}

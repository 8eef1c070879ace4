//! Menu item definitions
//!
//! A [`MenuItem`] carries the attributes every node shares plus an
//! [`ItemKind`] holding the per-type details. Code that needs to treat
//! item types differently matches on the kind exhaustively.

use serde::{Deserialize, Serialize};

use super::state::{MenuValue, RgbColor, ScrollPosition};

/// One node of the remote menu tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Unique id within the tree
    pub id: u16,
    pub name: String,
    /// Persistence offset on the device, -1 when not persisted
    #[serde(default = "no_eeprom")]
    pub eeprom_address: i32,
    /// Callback name on the device, designer-only and never on the wire
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "visible_default")]
    pub visible: bool,
    pub kind: ItemKind,
}

fn no_eeprom() -> i32 {
    -1
}

fn visible_default() -> bool {
    true
}

/// Per-type attributes of a menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Analog(AnalogInfo),
    Boolean {
        naming: BooleanNaming,
    },
    Enum {
        choices: Vec<String>,
    },
    Text {
        max_length: u16,
        edit_type: EditItemType,
    },
    /// Device-side only, the client displays but never edits these
    Float {
        decimal_places: u8,
    },
    Action,
    SubMenu,
    Remote {
        remote_no: u16,
    },
    ScrollChoice {
        item_width: u16,
        num_entries: u16,
        mode: ScrollChoiceMode,
    },
    Rgb32 {
        include_alpha: bool,
    },
    RuntimeList,
    /// Designer-only synthetic item
    CustomBuilder {
        kind: String,
    },
    LargeNumber {
        digits: u8,
        decimal_places: u8,
        negative_allowed: bool,
    },
}

/// Range and presentation of an analog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogInfo {
    pub max: i32,
    pub offset: i32,
    pub divisor: i32,
    pub unit: String,
}

impl Default for AnalogInfo {
    fn default() -> Self {
        Self {
            max: 100,
            offset: 0,
            divisor: 1,
            unit: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanNaming {
    OnOff,
    YesNo,
    TrueFalse,
    Checkbox,
}

impl BooleanNaming {
    pub fn code(self) -> u8 {
        match self {
            BooleanNaming::OnOff => 0,
            BooleanNaming::YesNo => 1,
            BooleanNaming::TrueFalse => 2,
            BooleanNaming::Checkbox => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BooleanNaming::OnOff),
            1 => Some(BooleanNaming::YesNo),
            2 => Some(BooleanNaming::TrueFalse),
            3 => Some(BooleanNaming::Checkbox),
            _ => None,
        }
    }

    /// Display text for a value under this naming
    pub fn label(self, value: bool) -> &'static str {
        match (self, value) {
            (BooleanNaming::OnOff, true) => "ON",
            (BooleanNaming::OnOff, false) => "OFF",
            (BooleanNaming::YesNo, true) => "YES",
            (BooleanNaming::YesNo, false) => "NO",
            (BooleanNaming::TrueFalse, true) => "TRUE",
            (BooleanNaming::TrueFalse, false) => "FALSE",
            (BooleanNaming::Checkbox, true) => "[X]",
            (BooleanNaming::Checkbox, false) => "[ ]",
        }
    }
}

/// How a text item is edited on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditItemType {
    PlainText,
    IpAddress,
    Time24,
    Time12,
    Time24Hundreds,
    GregorianDate,
    TimeDuration,
}

impl EditItemType {
    pub fn code(self) -> u8 {
        match self {
            EditItemType::PlainText => 0,
            EditItemType::IpAddress => 1,
            EditItemType::Time24 => 2,
            EditItemType::Time12 => 3,
            EditItemType::Time24Hundreds => 4,
            EditItemType::GregorianDate => 5,
            EditItemType::TimeDuration => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EditItemType::PlainText),
            1 => Some(EditItemType::IpAddress),
            2 => Some(EditItemType::Time24),
            3 => Some(EditItemType::Time12),
            4 => Some(EditItemType::Time24Hundreds),
            5 => Some(EditItemType::GregorianDate),
            6 => Some(EditItemType::TimeDuration),
            _ => None,
        }
    }
}

/// Where a scroll choice item keeps its entries on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollChoiceMode {
    ArrayInEeprom,
    ArrayInRam,
    CustomRenderFn,
}

impl ScrollChoiceMode {
    pub fn code(self) -> u8 {
        match self {
            ScrollChoiceMode::ArrayInEeprom => 0,
            ScrollChoiceMode::ArrayInRam => 1,
            ScrollChoiceMode::CustomRenderFn => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ScrollChoiceMode::ArrayInEeprom),
            1 => Some(ScrollChoiceMode::ArrayInRam),
            2 => Some(ScrollChoiceMode::CustomRenderFn),
            _ => None,
        }
    }
}

impl ItemKind {
    /// Short type name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Analog(_) => "analog",
            ItemKind::Boolean { .. } => "boolean",
            ItemKind::Enum { .. } => "enum",
            ItemKind::Text { .. } => "text",
            ItemKind::Float { .. } => "float",
            ItemKind::Action => "action",
            ItemKind::SubMenu => "submenu",
            ItemKind::Remote { .. } => "remote",
            ItemKind::ScrollChoice { .. } => "scroll_choice",
            ItemKind::Rgb32 { .. } => "rgb32",
            ItemKind::RuntimeList => "runtime_list",
            ItemKind::CustomBuilder { .. } => "custom_builder",
            ItemKind::LargeNumber { .. } => "large_number",
        }
    }
}

impl MenuItem {
    pub fn is_sub_menu(&self) -> bool {
        matches!(self.kind, ItemKind::SubMenu)
    }

    /// False for designer-only items that must never be sent to a device
    pub fn is_wire_type(&self) -> bool {
        !matches!(self.kind, ItemKind::CustomBuilder { .. })
    }

    /// Whether a client may send value changes for this item
    pub fn is_client_editable(&self) -> bool {
        match self.kind {
            ItemKind::Float { .. } | ItemKind::SubMenu | ItemKind::CustomBuilder { .. } => false,
            _ => !self.read_only,
        }
    }

    /// Natural zero value for the item type
    pub fn default_value(&self) -> MenuValue {
        match &self.kind {
            ItemKind::Analog(_) | ItemKind::Enum { .. } => MenuValue::Int(0),
            ItemKind::Boolean { .. } | ItemKind::Action | ItemKind::SubMenu => {
                MenuValue::Bool(false)
            }
            ItemKind::Text { .. } | ItemKind::Remote { .. } | ItemKind::CustomBuilder { .. } => {
                MenuValue::Text(String::new())
            }
            ItemKind::Float { .. } => MenuValue::Float(0.0),
            ItemKind::ScrollChoice { .. } => MenuValue::Scroll(ScrollPosition::default()),
            ItemKind::Rgb32 { .. } => MenuValue::Color(RgbColor::BLACK),
            ItemKind::RuntimeList => MenuValue::List(Vec::new()),
            ItemKind::LargeNumber { .. } => MenuValue::Decimal("0".to_string()),
        }
    }
}

/// Builder for [`MenuItem`]s
///
/// Each item type has its own entry point; the common attributes are set
/// with the chained setters afterwards.
#[derive(Debug, Clone)]
pub struct MenuItemBuilder {
    item: MenuItem,
}

impl MenuItemBuilder {
    fn new(id: u16, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            item: MenuItem {
                id,
                name: name.into(),
                eeprom_address: -1,
                function_name: None,
                read_only: false,
                visible: true,
                kind,
            },
        }
    }

    /// Start from an existing item, keeping all of its attributes
    pub fn from_item(item: &MenuItem) -> Self {
        Self { item: item.clone() }
    }

    pub fn analog(id: u16, name: impl Into<String>, info: AnalogInfo) -> Self {
        Self::new(id, name, ItemKind::Analog(info))
    }

    pub fn boolean(id: u16, name: impl Into<String>, naming: BooleanNaming) -> Self {
        Self::new(id, name, ItemKind::Boolean { naming })
    }

    pub fn enumeration<S: Into<String>>(
        id: u16,
        name: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        let choices = choices.into_iter().map(Into::into).collect();
        Self::new(id, name, ItemKind::Enum { choices })
    }

    pub fn text(
        id: u16,
        name: impl Into<String>,
        max_length: u16,
        edit_type: EditItemType,
    ) -> Self {
        Self::new(
            id,
            name,
            ItemKind::Text {
                max_length,
                edit_type,
            },
        )
    }

    pub fn float(id: u16, name: impl Into<String>, decimal_places: u8) -> Self {
        Self::new(id, name, ItemKind::Float { decimal_places })
    }

    pub fn action(id: u16, name: impl Into<String>) -> Self {
        Self::new(id, name, ItemKind::Action)
    }

    pub fn sub_menu(id: u16, name: impl Into<String>) -> Self {
        Self::new(id, name, ItemKind::SubMenu)
    }

    pub fn remote(id: u16, name: impl Into<String>, remote_no: u16) -> Self {
        Self::new(id, name, ItemKind::Remote { remote_no })
    }

    pub fn scroll_choice(
        id: u16,
        name: impl Into<String>,
        item_width: u16,
        num_entries: u16,
        mode: ScrollChoiceMode,
    ) -> Self {
        Self::new(
            id,
            name,
            ItemKind::ScrollChoice {
                item_width,
                num_entries,
                mode,
            },
        )
    }

    pub fn rgb32(id: u16, name: impl Into<String>, include_alpha: bool) -> Self {
        Self::new(id, name, ItemKind::Rgb32 { include_alpha })
    }

    pub fn runtime_list(id: u16, name: impl Into<String>) -> Self {
        Self::new(id, name, ItemKind::RuntimeList)
    }

    pub fn custom_builder(id: u16, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(id, name, ItemKind::CustomBuilder { kind: kind.into() })
    }

    pub fn large_number(
        id: u16,
        name: impl Into<String>,
        digits: u8,
        decimal_places: u8,
        negative_allowed: bool,
    ) -> Self {
        Self::new(
            id,
            name,
            ItemKind::LargeNumber {
                digits,
                decimal_places,
                negative_allowed,
            },
        )
    }

    pub fn id(mut self, id: u16) -> Self {
        self.item.id = id;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.item.name = name.into();
        self
    }

    pub fn eeprom(mut self, address: i32) -> Self {
        self.item.eeprom_address = address;
        self
    }

    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.item.function_name = Some(name.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.item.read_only = read_only;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.item.visible = visible;
        self
    }

    pub fn build(self) -> MenuItem {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let item = MenuItemBuilder::analog(5, "Volume", AnalogInfo::default()).build();
        assert_eq!(item.id, 5);
        assert_eq!(item.eeprom_address, -1);
        assert!(item.visible);
        assert!(!item.read_only);
        assert!(item.function_name.is_none());
        assert_eq!(item.default_value(), MenuValue::Int(0));
    }

    #[test]
    fn test_from_item_keeps_attributes() {
        let original = MenuItemBuilder::boolean(3, "Power", BooleanNaming::OnOff)
            .eeprom(12)
            .read_only(true)
            .build();
        let renamed = MenuItemBuilder::from_item(&original).name("Mains").build();
        assert_eq!(renamed.eeprom_address, 12);
        assert!(renamed.read_only);
        assert_eq!(renamed.name, "Mains");
    }

    #[test]
    fn test_editability() {
        assert!(!MenuItemBuilder::float(1, "Temp", 2).build().is_client_editable());
        assert!(!MenuItemBuilder::sub_menu(2, "Settings").build().is_client_editable());
        assert!(
            !MenuItemBuilder::action(3, "Go")
                .read_only(true)
                .build()
                .is_client_editable()
        );
        assert!(MenuItemBuilder::action(3, "Go").build().is_client_editable());
    }

    #[test]
    fn test_custom_builder_is_not_wire_type() {
        let item = MenuItemBuilder::custom_builder(9, "Wifi", "iot-monitor").build();
        assert!(!item.is_wire_type());
        assert!(MenuItemBuilder::runtime_list(10, "Rows").build().is_wire_type());
    }

    #[test]
    fn test_item_serializes_with_type_tag() {
        let item = MenuItemBuilder::enumeration(4, "Mode", ["Eco", "Boost"]).build();
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"type\":\"enum\""));
        let back: MenuItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}

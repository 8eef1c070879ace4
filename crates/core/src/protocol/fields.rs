//! Wire constants: frame markers, message tags and field keys

pub const START_OF_MSG: u8 = 0x01;
pub const PROTOCOL_TAG_VAL: u8 = 0x01;
pub const END_OF_MSG: u8 = 0x02;
pub const FIELD_TERMINATOR: u8 = b'|';
pub const KEY_VALUE_SEPARATOR: u8 = b'=';
pub const ESCAPE: u8 = b'\\';

/// Frames longer than this are discarded as corrupt
pub const MAX_FRAME_LEN: usize = 4096;

/// Field keys for list entries, `CA` to `Cz`
pub const CHOICE_KEYS: [&str; 52] = [
    "CA", "CB", "CC", "CD", "CE", "CF", "CG", "CH", "CI", "CJ", "CK", "CL", "CM",
    "CN", "CO", "CP", "CQ", "CR", "CS", "CT", "CU", "CV", "CW", "CX", "CY", "CZ",
    "Ca", "Cb", "Cc", "Cd", "Ce", "Cf", "Cg", "Ch", "Ci", "Cj", "Ck", "Cl", "Cm",
    "Cn", "Co", "Cp", "Cq", "Cr", "Cs", "Ct", "Cu", "Cv", "Cw", "Cx", "Cy", "Cz",
];

pub mod tag {
    pub const JOIN: &str = "NJ";
    pub const HEARTBEAT: &str = "HB";
    pub const BOOTSTRAP: &str = "BS";
    pub const ANALOG_BOOT: &str = "BA";
    pub const BOOLEAN_BOOT: &str = "BB";
    pub const ENUM_BOOT: &str = "BE";
    pub const TEXT_BOOT: &str = "BT";
    pub const FLOAT_BOOT: &str = "BF";
    pub const ACTION_BOOT: &str = "BC";
    pub const SUBMENU_BOOT: &str = "BM";
    pub const REMOTE_BOOT: &str = "BR";
    pub const SCROLL_CHOICE_BOOT: &str = "BZ";
    pub const RGB32_BOOT: &str = "BK";
    pub const RUNTIME_LIST_BOOT: &str = "BL";
    pub const LARGE_NUMBER_BOOT: &str = "BN";
    pub const CHANGE: &str = "VC";
    pub const ACK: &str = "AK";
    pub const DIALOG: &str = "DM";
    pub const PAIRING_REQUEST: &str = "PR";
    pub const PAIRING_RESPONSE: &str = "PA";
    pub const NAMES_REQUEST: &str = "GN";
}

pub mod key {
    pub const NAME: &str = "NM";
    pub const UUID: &str = "UU";
    pub const VERSION: &str = "VE";
    pub const PLATFORM: &str = "PF";
    pub const SERIAL_NO: &str = "US";
    pub const HB_INTERVAL: &str = "HI";
    pub const HB_MODE: &str = "HR";
    pub const BOOT_TYPE: &str = "BT";
    pub const ID: &str = "ID";
    pub const PARENT_ID: &str = "PI";
    pub const EEPROM: &str = "IE";
    pub const READ_ONLY: &str = "RO";
    pub const VISIBLE: &str = "VI";
    pub const CURRENT_VAL: &str = "VC";
    pub const ANALOG_MAX: &str = "AM";
    pub const ANALOG_OFFSET: &str = "AO";
    pub const ANALOG_DIVISOR: &str = "AD";
    pub const ANALOG_UNIT: &str = "AU";
    pub const BOOLEAN_NAMING: &str = "BN";
    pub const NO_OF_CHOICES: &str = "NC";
    pub const MAX_LENGTH: &str = "ML";
    pub const EDIT_TYPE: &str = "EM";
    pub const DECIMAL_PLACES: &str = "FD";
    pub const REMOTE_NO: &str = "RN";
    pub const WIDTH: &str = "WI";
    pub const ALPHA: &str = "RA";
    pub const NEGATIVE_ALLOWED: &str = "NA";
    pub const CORRELATION: &str = "IC";
    pub const CHANGE_TYPE: &str = "TC";
    pub const ACK_STATUS: &str = "ST";
    pub const DIALOG_MODE: &str = "MO";
    pub const HEADER: &str = "HF";
    pub const BUFFER: &str = "BU";
    pub const BUTTON1: &str = "B1";
    pub const BUTTON2: &str = "B2";
    pub const LOCALE: &str = "LC";
}

/// Field key for the `index`-th choice, `None` past the 52 available letters
pub fn choice_key(index: usize) -> Option<&'static str> {
    CHOICE_KEYS.get(index).copied()
}

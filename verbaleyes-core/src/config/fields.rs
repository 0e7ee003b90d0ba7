//! Persisted configuration layout
//!
//! Fields are stored back to back in table order. The layout is the storage
//! format of every device in the field, so the order and sizes below must not
//! change.

use crate::connection::Stage;

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    /// Byte string, NUL terminated when shorter than `max_len`
    Text { max_len: u16 },
    /// Big-endian `u16`
    Unsigned,
    /// Big-endian `i16`
    Signed,
}

impl FieldKind {
    /// Bytes this kind occupies in storage
    pub const fn storage_len(self) -> u16 {
        match self {
            FieldKind::Text { max_len } => max_len,
            FieldKind::Unsigned | FieldKind::Signed => 2,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, FieldKind::Text { .. })
    }
}

/// One named setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigField {
    /// Key used on the configuration channel
    pub name: &'static str,
    pub kind: FieldKind,
    /// Start of the field in storage
    pub offset: u16,
    /// Earliest connection stage that depends on this field
    pub resume: Stage,
}

impl ConfigField {
    /// Bytes occupied in storage
    pub const fn len(&self) -> u16 {
        self.kind.storage_len()
    }

    /// One past the last byte of the field
    pub const fn end(&self) -> u16 {
        self.offset + self.len()
    }
}

/// Identifies a field of [`FIELDS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldId {
    Ssid,
    SsidKey,
    Host,
    Port,
    Path,
    Proj,
    ProjKey,
    SpeedMin,
    SpeedMax,
    Deadzone,
    CalLow,
    CalHigh,
    Sensitivity,
}

impl FieldId {
    /// All fields in storage order
    pub const ALL: [FieldId; FIELD_COUNT] = [
        FieldId::Ssid,
        FieldId::SsidKey,
        FieldId::Host,
        FieldId::Port,
        FieldId::Path,
        FieldId::Proj,
        FieldId::ProjKey,
        FieldId::SpeedMin,
        FieldId::SpeedMax,
        FieldId::Deadzone,
        FieldId::CalLow,
        FieldId::CalHigh,
        FieldId::Sensitivity,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Table entry for this field
    pub fn field(self) -> &'static ConfigField {
        &FIELDS[self as usize]
    }

    /// Look up a field by its key
    pub fn from_name(name: &str) -> Option<FieldId> {
        FieldId::ALL.into_iter().find(|id| id.field().name == name)
    }
}

/// Number of configurable fields
pub const FIELD_COUNT: usize = 13;

/// Capacity needed to hold the longest text field
pub const MAX_TEXT_LEN: usize = 64;

const LAYOUT: [(&str, FieldKind, Stage); FIELD_COUNT] = [
    ("ssid", FieldKind::Text { max_len: 32 }, Stage::NetworkConnect),
    ("ssidkey", FieldKind::Text { max_len: 63 }, Stage::NetworkConnect),
    ("host", FieldKind::Text { max_len: 64 }, Stage::SocketConnect),
    ("port", FieldKind::Unsigned, Stage::SocketConnect),
    ("path", FieldKind::Text { max_len: 32 }, Stage::SocketConnect),
    ("proj", FieldKind::Text { max_len: 32 }, Stage::SocketConnect),
    ("projkey", FieldKind::Text { max_len: 32 }, Stage::SocketConnect),
    ("speedmin", FieldKind::Signed, Stage::DeriveCalibration),
    ("speedmax", FieldKind::Signed, Stage::DeriveCalibration),
    ("deadzone", FieldKind::Unsigned, Stage::DeriveCalibration),
    ("callow", FieldKind::Unsigned, Stage::DeriveCalibration),
    ("calhigh", FieldKind::Unsigned, Stage::DeriveCalibration),
    ("sensitivity", FieldKind::Unsigned, Stage::DeriveCalibration),
];

const fn build_table() -> [ConfigField; FIELD_COUNT] {
    let mut table = [ConfigField {
        name: "",
        kind: FieldKind::Unsigned,
        offset: 0,
        resume: Stage::NetworkConnect,
    }; FIELD_COUNT];

    let mut offset = 0;
    let mut i = 0;
    while i < FIELD_COUNT {
        let (name, kind, resume) = LAYOUT[i];
        table[i] = ConfigField {
            name,
            kind,
            offset,
            resume,
        };
        offset += kind.storage_len();
        i += 1;
    }
    table
}

/// All fields with their computed storage offsets
pub static FIELDS: [ConfigField; FIELD_COUNT] = build_table();

/// Total length of the configuration area
pub const CONFIG_LEN: u16 = {
    let mut len = 0;
    let mut i = 0;
    while i < FIELD_COUNT {
        len += LAYOUT[i].1.storage_len();
        i += 1;
    }
    len
};

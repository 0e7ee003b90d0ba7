//! Persisted configuration
//!
//! The field table fixes where every setting lives in the configuration
//! area; the accessors read and write typed values through
//! [`verbaleyes_hal::ConfigStorage`].

pub mod fields;
pub mod settings;

pub use fields::{ConfigField, FieldId, FieldKind, CONFIG_LEN, FIELDS, FIELD_COUNT, MAX_TEXT_LEN};
pub use settings::{read_signed, read_text, read_unsigned, write_integer, write_text, FieldText};

//! Persistent storage abstractions
//!
//! The configuration lives in a flat, byte-addressable area (EEPROM or an
//! emulated EEPROM page in flash). Writes may be buffered by the
//! implementation until [`ConfigStorage::commit`] is called.

/// Errors from storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Underlying flash/EEPROM operation failed
    Device,
}

/// Byte-addressable configuration storage
///
/// Offsets are relative to the start of the configuration area. The
/// controller never reads or writes past the configured layout length.
pub trait ConfigStorage {
    /// Read one byte at `offset`
    fn read(&mut self, offset: u16) -> u8;

    /// Write one byte at `offset`
    ///
    /// The write only has to become durable after [`ConfigStorage::commit`].
    fn write(&mut self, offset: u16, byte: u8);

    /// Make all previous writes durable
    fn commit(&mut self) -> Result<(), StorageError>;
}

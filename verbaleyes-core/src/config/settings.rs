//! Typed access to stored fields

use super::fields::{FieldId, FieldKind, MAX_TEXT_LEN};
use heapless::String;
use verbaleyes_hal::ConfigStorage;

/// Owned copy of a text field
pub type FieldText = String<MAX_TEXT_LEN>;

/// Read a text field up to its NUL terminator or maximum length
///
/// Bytes outside printable ASCII are replaced with `?` so the value is
/// always valid UTF-8.
pub fn read_text<S: ConfigStorage + ?Sized>(storage: &mut S, id: FieldId) -> FieldText {
    let field = id.field();
    let mut text = FieldText::new();
    for offset in field.offset..field.end() {
        let byte = match storage.read(offset) {
            0 => break,
            b if b.is_ascii() => b,
            _ => b'?',
        };
        // Capacity covers every text field
        let _ = text.push(char::from(byte));
    }
    text
}

/// Read a 2-byte big-endian field
pub fn read_unsigned<S: ConfigStorage + ?Sized>(storage: &mut S, id: FieldId) -> u16 {
    let offset = id.field().offset;
    u16::from_be_bytes([storage.read(offset), storage.read(offset + 1)])
}

/// Read a 2-byte big-endian field as two's complement
pub fn read_signed<S: ConfigStorage + ?Sized>(storage: &mut S, id: FieldId) -> i16 {
    read_unsigned(storage, id) as i16
}

/// Store a text field, truncated to its maximum length
///
/// Does nothing for integer fields.
pub fn write_text<S: ConfigStorage + ?Sized>(storage: &mut S, id: FieldId, value: &str) {
    let field = id.field();
    let FieldKind::Text { max_len } = field.kind else {
        return;
    };
    let bytes = value.as_bytes();
    let len = bytes.len().min(max_len as usize);
    for (i, &byte) in bytes[..len].iter().enumerate() {
        storage.write(field.offset + i as u16, byte);
    }
    if len < max_len as usize {
        storage.write(field.offset + len as u16, 0);
    }
}

/// Store an integer field big-endian
///
/// Signed fields take the two's complement bit pattern. Does nothing for
/// text fields.
pub fn write_integer<S: ConfigStorage + ?Sized>(storage: &mut S, id: FieldId, value: u16) {
    let field = id.field();
    if !field.kind.is_integer() {
        return;
    }
    let [high, low] = value.to_be_bytes();
    storage.write(field.offset, high);
    storage.write(field.offset + 1, low);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHost;

    #[test]
    fn test_text_round_trip_stops_at_nul() {
        let mut host = MockHost::new();
        write_text(&mut host, FieldId::Ssid, "office");
        assert_eq!(read_text(&mut host, FieldId::Ssid).as_str(), "office");
        assert_eq!(host.storage[6], 0);
    }

    #[test]
    fn test_text_truncated_to_field() {
        let mut host = MockHost::new();
        let long = [b'x'; 40];
        write_text(&mut host, FieldId::Ssid, core::str::from_utf8(&long).unwrap());

        let stored = read_text(&mut host, FieldId::Ssid);
        assert_eq!(stored.len(), 32);
        // Neighbouring field untouched
        assert!(host.writes.iter().all(|&offset| offset < 32));
    }

    #[test]
    fn test_non_ascii_replaced() {
        let mut host = MockHost::new();
        host.storage[0] = b'a';
        host.storage[1] = 0xC3;
        host.storage[2] = 0;
        assert_eq!(read_text(&mut host, FieldId::Ssid).as_str(), "a?");
    }

    #[test]
    fn test_integers_big_endian() {
        let mut host = MockHost::new();
        write_integer(&mut host, FieldId::Port, 8080);
        assert_eq!(&host.storage[159..161], &[0x1F, 0x90]);
        assert_eq!(read_unsigned(&mut host, FieldId::Port), 8080);

        write_integer(&mut host, FieldId::SpeedMin, (-2i16) as u16);
        assert_eq!(read_signed(&mut host, FieldId::SpeedMin), -2);
    }

    #[test]
    fn test_kind_mismatch_ignored() {
        let mut host = MockHost::new();
        write_text(&mut host, FieldId::Port, "80");
        write_integer(&mut host, FieldId::Host, 80);
        assert!(host.writes.is_empty());
    }
}

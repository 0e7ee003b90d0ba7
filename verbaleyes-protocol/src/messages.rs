//! Application messages carried in WebSocket text frames
//!
//! Every command is a compact JSON object addressed to the server's `_core`
//! handler:
//! - `{"_core": {"auth": {"id": "<project>", "key": "<project key>"}}}`
//! - `{"_core": {"doc": {"speed": <value>}}}`
//! - `{"_core": {"doc": {"offset": 0}}}`

use crate::frame::{
    encode_text_frame_to_vec, FrameError, MASK_LEN, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
use core::fmt::{self, Write as _};
use heapless::{String, Vec};

/// Marker the server includes in a successful authentication response
///
/// Compared against the payload with whitespace removed.
pub const AUTH_SUCCESS_MARKER: &[u8] = b"\"authed\":true";

/// Commands sent from the controller to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoreMessage<'a> {
    /// Join a project
    Auth { id: &'a str, key: &'a str },
    /// New scroll speed
    Speed(Hundredths),
    /// Reset the scroll position to the top
    Offset,
}

impl<'a> CoreMessage<'a> {
    /// Render the JSON payload
    pub fn to_payload(&self) -> Result<String<MAX_PAYLOAD_SIZE>, FrameError> {
        let mut payload = String::new();
        let result = match self {
            CoreMessage::Auth { id, key } => write!(
                payload,
                "{{\"_core\": {{\"auth\": {{\"id\": \"{}\", \"key\": \"{}\"}}}}}}",
                JsonStr(id),
                JsonStr(key)
            ),
            CoreMessage::Speed(speed) => {
                write!(payload, "{{\"_core\": {{\"doc\": {{\"speed\": {speed}}}}}}}")
            }
            CoreMessage::Offset => payload
                .push_str("{\"_core\": {\"doc\": {\"offset\": 0}}}")
                .map_err(|_| fmt::Error),
        };
        result.map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(payload)
    }

    /// Render the payload and wrap it in a masked text frame
    pub fn to_frame(
        &self,
        mask: [u8; MASK_LEN],
    ) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let payload = self.to_payload()?;
        encode_text_frame_to_vec(payload.as_bytes(), mask)
    }
}

/// Fixed-point value in hundredths, displayed with two decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hundredths(pub i32);

impl fmt::Display for Hundredths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// String rendered as the contents of a JSON string literal
struct JsonStr<'a>(&'a str);

impl fmt::Display for JsonStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

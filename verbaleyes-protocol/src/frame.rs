//! WebSocket frame encoding and decoding (RFC 6455 §5)
//!
//! Client-to-server frame format used by the controller:
//! - Byte 0: FIN bit + text opcode (0x81)
//! - Byte 1: MASK bit + 7-bit payload length (126 = 16-bit length follows)
//! - Optional 2-byte big-endian extended length
//! - 4-byte masking key
//! - Payload, XORed with the masking key
//!
//! Server-to-client frames must not be masked; only the header is parsed
//! here, the payload is consumed by the caller byte by byte.

use heapless::Vec;
use rand_core::RngCore;

/// FIN bit with the text opcode
pub const TEXT_FRAME_START: u8 = 0x81;

/// Mask bit in the second header byte
pub const MASK_BIT: u8 = 0x80;

/// Masking key length
pub const MASK_LEN: usize = 4;

/// Largest payload length that fits in the 7-bit length field
pub const MAX_SHORT_PAYLOAD: usize = 125;

/// Length marker for a 16-bit extended payload length
pub const EXTENDED_LEN_16: u8 = 126;

/// Length marker for a 64-bit extended payload length
pub const EXTENDED_LEN_64: u8 = 127;

/// Maximum payload size the controller ever sends
pub const MAX_PAYLOAD_SIZE: usize = 512;

/// Maximum complete frame size (header + extended length + mask + payload)
pub const MAX_FRAME_SIZE: usize = 2 + 2 + MASK_LEN + MAX_PAYLOAD_SIZE;

/// Errors that can occur during frame encoding or header parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// First header byte is not an unfragmented text frame
    UnsupportedFrame(u8),
    /// Server sent a masked frame
    MaskedFrame,
    /// Server used the 64-bit length form
    TooLong,
}

/// Generate a fresh masking key
pub fn random_mask<R: RngCore + ?Sized>(rng: &mut R) -> [u8; MASK_LEN] {
    let mut mask = [0u8; MASK_LEN];
    rng.fill_bytes(&mut mask);
    mask
}

/// XOR `data` in place with the cyclic masking key
///
/// Applying the same mask twice restores the original data.
pub fn apply_mask(data: &mut [u8], mask: [u8; MASK_LEN]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}

/// Header length for a masked client frame carrying `payload_len` bytes
pub fn header_len(payload_len: usize) -> usize {
    if payload_len <= MAX_SHORT_PAYLOAD {
        2 + MASK_LEN
    } else {
        4 + MASK_LEN
    }
}

/// Encode a masked text frame into a byte buffer
///
/// Returns the number of bytes written
pub fn encode_text_frame(
    payload: &[u8],
    mask: [u8; MASK_LEN],
    buffer: &mut [u8],
) -> Result<usize, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }

    let header = header_len(payload.len());
    let frame_len = header + payload.len();
    if buffer.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    buffer[0] = TEXT_FRAME_START;
    if payload.len() <= MAX_SHORT_PAYLOAD {
        buffer[1] = MASK_BIT | payload.len() as u8;
    } else {
        buffer[1] = MASK_BIT | EXTENDED_LEN_16;
        buffer[2..4].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    }
    buffer[header - MASK_LEN..header].copy_from_slice(&mask);

    let body = &mut buffer[header..frame_len];
    body.copy_from_slice(payload);
    apply_mask(body, mask);

    Ok(frame_len)
}

/// Encode a masked text frame into a heapless Vec
pub fn encode_text_frame_to_vec(
    payload: &[u8],
    mask: [u8; MASK_LEN],
) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let len = encode_text_frame(payload, mask, &mut buffer)?;
    let mut vec = Vec::new();
    vec.extend_from_slice(&buffer[..len])
        .map_err(|_| FrameError::BufferTooSmall)?;
    Ok(vec)
}

/// State machine for parsing the header of a server frame
///
/// Fed one byte at a time; yields the payload length once the header is
/// complete.
#[derive(Debug, Clone)]
pub struct FrameHeaderParser {
    state: ParseState,
    length: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for FIN/opcode byte
    WaitingForStart,
    /// Waiting for mask bit and 7-bit length
    WaitingForLength,
    /// Waiting for high byte of 16-bit length
    WaitingForExtendedHigh,
    /// Waiting for low byte of 16-bit length
    WaitingForExtendedLow,
}

impl Default for FrameHeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHeaderParser {
    /// Create a new header parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForStart,
            length: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForStart;
        self.length = 0;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(len))` when the header is complete,
    /// `Ok(None)` when more bytes are needed, or `Err` on a frame the
    /// controller does not support. The parser resets after either outcome.
    pub fn feed(&mut self, byte: u8) -> Result<Option<u16>, FrameError> {
        match self.state {
            ParseState::WaitingForStart => {
                if byte != TEXT_FRAME_START {
                    self.reset();
                    return Err(FrameError::UnsupportedFrame(byte));
                }
                self.state = ParseState::WaitingForLength;
                Ok(None)
            }
            ParseState::WaitingForLength => {
                if byte & MASK_BIT != 0 {
                    self.reset();
                    return Err(FrameError::MaskedFrame);
                }
                match byte {
                    EXTENDED_LEN_64 => {
                        self.reset();
                        Err(FrameError::TooLong)
                    }
                    EXTENDED_LEN_16 => {
                        self.state = ParseState::WaitingForExtendedHigh;
                        Ok(None)
                    }
                    len => {
                        self.reset();
                        Ok(Some(len as u16))
                    }
                }
            }
            ParseState::WaitingForExtendedHigh => {
                self.length = (byte as u16) << 8;
                self.state = ParseState::WaitingForExtendedLow;
                Ok(None)
            }
            ParseState::WaitingForExtendedLow => {
                let len = self.length | byte as u16;
                self.reset();
                Ok(Some(len))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASK: [u8; 4] = [0x37, 0xFA, 0x21, 0x3D];

    #[test]
    fn test_encode_short_frame_rfc_example() {
        // RFC 6455 §5.7: masked "Hello"
        let mut buffer = [0u8; 16];
        let len = encode_text_frame(b"Hello", MASK, &mut buffer).unwrap();

        assert_eq!(len, 11);
        assert_eq!(
            &buffer[..len],
            &[0x81, 0x85, 0x37, 0xFA, 0x21, 0x3D, 0x7F, 0x9F, 0x4D, 0x51, 0x58]
        );
    }

    #[test]
    fn test_encode_extended_length_threshold() {
        let payload = [b'a'; 126];
        let frame = encode_text_frame_to_vec(&payload, [0; 4]).unwrap();

        assert_eq!(frame.len(), 4 + MASK_LEN + 126);
        assert_eq!(frame[1], MASK_BIT | EXTENDED_LEN_16);
        assert_eq!(&frame[2..4], &[0, 126]);

        let payload = [b'a'; 125];
        let frame = encode_text_frame_to_vec(&payload, [0; 4]).unwrap();
        assert_eq!(frame.len(), 2 + MASK_LEN + 125);
        assert_eq!(frame[1], MASK_BIT | 125);
    }

    #[test]
    fn test_mask_is_reversible() {
        let mut frame = encode_text_frame_to_vec(b"{\"speed\": 1.00}", MASK).unwrap();
        let header = header_len(15);
        apply_mask(&mut frame[header..], MASK);
        assert_eq!(&frame[header..], b"{\"speed\": 1.00}");
    }

    #[test]
    fn test_payload_too_large() {
        let payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(
            encode_text_frame_to_vec(&payload, MASK),
            Err(FrameError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buffer = [0u8; 8];
        assert_eq!(
            encode_text_frame(b"Hello", MASK, &mut buffer),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_parse_short_header() {
        let mut parser = FrameHeaderParser::new();
        assert_eq!(parser.feed(0x81), Ok(None));
        assert_eq!(parser.feed(0x05), Ok(Some(5)));
        // Reset after a complete header
        assert_eq!(parser.feed(0x05), Err(FrameError::UnsupportedFrame(0x05)));
    }

    #[test]
    fn test_parse_extended_header() {
        let mut parser = FrameHeaderParser::new();
        assert_eq!(parser.feed(0x81), Ok(None));
        assert_eq!(parser.feed(126), Ok(None));
        assert_eq!(parser.feed(0x01), Ok(None));
        assert_eq!(parser.feed(0x02), Ok(Some(0x0102)));
    }

    #[test]
    fn test_parse_rejects_unsupported() {
        let mut parser = FrameHeaderParser::new();
        assert_eq!(parser.feed(0x01), Err(FrameError::UnsupportedFrame(0x01)));

        assert_eq!(parser.feed(0x81), Ok(None));
        assert_eq!(parser.feed(0x85), Err(FrameError::MaskedFrame));

        assert_eq!(parser.feed(0x81), Ok(None));
        assert_eq!(parser.feed(127), Err(FrameError::TooLong));
    }
}

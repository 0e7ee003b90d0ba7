//! HTTP Upgrade handshake (RFC 6455 §4.1)
//!
//! The client sends a fixed set of headers with a random 16-byte nonce,
//! base64 encoded, and expects the server to answer with
//! `base64(SHA-1(key + GUID))` in `Sec-WebSocket-Accept`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use core::fmt::Write as _;
use heapless::String;
use rand_core::RngCore;
use sha1::{Digest, Sha1};

/// GUID appended to the key before hashing (RFC 6455 §1.3)
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Length of the base64 encoded `Sec-WebSocket-Key`
pub const KEY_LEN: usize = 24;

/// Length of the base64 encoded `Sec-WebSocket-Accept` value
pub const ACCEPT_LEN: usize = 28;

/// Capacity for the upgrade request, sized for the longest stored host and path
pub const MAX_REQUEST_SIZE: usize = 256;

/// Errors while preparing the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandshakeError {
    /// Request does not fit in [`MAX_REQUEST_SIZE`]
    RequestTooLong,
    /// Base64 output buffer was too small
    Encoding,
}

/// A `Sec-WebSocket-Key` nonce in its encoded form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebSocketKey([u8; KEY_LEN]);

impl WebSocketKey {
    /// Draw a fresh key from `rng`
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Result<Self, HandshakeError> {
        let mut nonce = [0u8; 16];
        rng.fill_bytes(&mut nonce);
        Self::from_nonce(&nonce)
    }

    /// Encode a known nonce
    pub fn from_nonce(nonce: &[u8; 16]) -> Result<Self, HandshakeError> {
        let mut encoded = [0u8; KEY_LEN];
        let len = STANDARD
            .encode_slice(nonce, &mut encoded)
            .map_err(|_| HandshakeError::Encoding)?;
        debug_assert_eq!(len, KEY_LEN);
        Ok(Self(encoded))
    }

    /// Key as sent on the wire
    pub fn as_str(&self) -> &str {
        // base64 output is pure ASCII
        core::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The `Sec-WebSocket-Accept` value a compliant server answers with
    pub fn accept_value(&self) -> Result<[u8; ACCEPT_LEN], HandshakeError> {
        accept_value(&self.0)
    }
}

/// Compute `base64(SHA-1(key + GUID))`
pub fn accept_value(key: &[u8]) -> Result<[u8; ACCEPT_LEN], HandshakeError> {
    let mut hasher = Sha1::new();
    hasher.update(key);
    hasher.update(WEBSOCKET_GUID.as_bytes());
    let digest = hasher.finalize();

    let mut encoded = [0u8; ACCEPT_LEN];
    STANDARD
        .encode_slice(digest, &mut encoded)
        .map_err(|_| HandshakeError::Encoding)?;
    Ok(encoded)
}

/// Build the upgrade request for `path` on `host`
pub fn upgrade_request(
    path: &str,
    host: &str,
    key: &WebSocketKey,
) -> Result<String<MAX_REQUEST_SIZE>, HandshakeError> {
    let mut request = String::new();
    write!(
        request,
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: {}\r\n\r\n",
        key.as_str()
    )
    .map_err(|_| HandshakeError::RequestTooLong)?;
    Ok(request)
}

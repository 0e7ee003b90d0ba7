//! verbalEyes WebSocket client protocol
//!
//! The controller talks to the server over a plain RFC 6455 WebSocket:
//! ```text
//!  controller                                server
//!      │ GET <path> HTTP/1.1 + Upgrade headers  │
//!      │───────────────────────────────────────►│
//!      │ HTTP/1.1 101 + Sec-WebSocket-Accept    │
//!      │◄───────────────────────────────────────│
//!      │ text frame: {"_core": {"auth": ...}}   │
//!      │───────────────────────────────────────►│
//!      │ text frame: {... "authed": true ...}   │
//!      │◄───────────────────────────────────────│
//!      │ text frames: speed / offset updates    │
//!      │───────────────────────────────────────►│
//! ```
//!
//! Everything here works on fixed-size buffers so it can run on a
//! microcontroller without an allocator.

#![no_std]
#![deny(unsafe_code)]

pub mod frame;
pub mod handshake;
pub mod matcher;
pub mod messages;

pub use frame::{FrameError, FrameHeaderParser, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use handshake::{HandshakeError, WebSocketKey, ACCEPT_LEN, MAX_REQUEST_SIZE};
pub use matcher::Matcher;
pub use messages::{CoreMessage, Hundredths, AUTH_SUCCESS_MARKER};

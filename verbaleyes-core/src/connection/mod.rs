//! Connection to the verbalEyes server
//!
//! Brings the link up one stage at a time without blocking:
//!
//! ```text
//! NetworkConnect → NetworkAwait → SocketConnect → SocketAwait
//!   → HandshakeSend → StatusLineRead → HeaderRead
//!   → AuthSend → AuthOpcodeRead → AuthLengthRead → AuthPayloadRead
//!   → DeriveCalibration → Steady
//! ```
//!
//! Failures log a diagnostic and hold off retrying for a fixed delay.

pub mod machine;
pub mod response;
pub mod stage;

pub use machine::ConnectionStateMachine;
pub use stage::{Backoff, BackoffKind, Rewind, Stage};

use rand_core::RngCore;
use verbaleyes_hal::Socket;
use verbaleyes_protocol::frame::random_mask;
use verbaleyes_protocol::{CoreMessage, FrameError};

/// Result of one [`ConnectionStateMachine::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// Still connecting, or waiting out a backoff
    Working,
    /// Authenticated and ready for telemetry
    Connected,
    /// A stage failed during this call; a backoff is now running
    Failed,
}

/// Frame `message` with a fresh mask and send it
pub fn send_message<H: Socket + RngCore + ?Sized>(
    host: &mut H,
    message: &CoreMessage<'_>,
) -> Result<(), FrameError> {
    let frame = message.to_frame(random_mask(host))?;
    host.send(&frame);
    Ok(())
}

//! Resumable connection state machine
//!
//! Every stage either completes and falls through to the next one within the
//! same call, or suspends until the next call. Nothing here waits on I/O.

use super::response::{HeaderScan, StatusLine, StatusOutcome};
use super::stage::{Backoff, BackoffKind, Rewind, Stage};
use super::{send_message, Progress};
use crate::config::{read_text, read_unsigned, FieldId};
use crate::log::{echo_response, logf};
use crate::speed::{Calibration, CalibrationSettings};
use crate::timing::Timing;
use verbaleyes_hal::{Clock, Host, LinkStatus, LogSink};
use verbaleyes_protocol::handshake::upgrade_request;
use verbaleyes_protocol::{
    CoreMessage, FrameError, FrameHeaderParser, HandshakeError, Matcher, WebSocketKey,
    AUTH_SUCCESS_MARKER,
};

#[cfg(feature = "defmt")]
use defmt::{debug, warn};

// Stub macros when defmt is not available
#[cfg(not(feature = "defmt"))]
macro_rules! debug {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "defmt"))]
macro_rules! warn {
    ($($arg:tt)*) => {{}};
}

const UNEXPECTED_STATUS: &str = "\r\nReceived unexpected HTTP response code";

/// What a stage handler wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Stage done, continue with the next one now
    Advance,
    /// Come back on the next call
    Suspend,
    /// Failure logged and backoff armed
    Failed,
}

/// Brings up and supervises the link to the server
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    stage: Stage,
    backoff: Option<Backoff>,
    timing: Timing,
    /// Timeout of the stage in progress
    deadline: u64,
    /// Second in which the last progress dot was printed
    last_tick: Option<u64>,
    status: StatusLine,
    headers: HeaderScan,
    frame: FrameHeaderParser,
    /// Auth payload bytes still to read
    remaining: u16,
    auth: Matcher,
    calibration: Option<Calibration>,
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new(&Timing::default())
    }
}

impl Rewind for ConnectionStateMachine {
    fn rewind_to(&mut self, target: Stage) {
        self.stage.rewind_to(target);
    }
}

impl ConnectionStateMachine {
    pub fn new(timing: &Timing) -> Self {
        Self {
            stage: Stage::NetworkConnect,
            backoff: None,
            timing: *timing,
            deadline: 0,
            last_tick: None,
            status: StatusLine::default(),
            headers: HeaderScan::default(),
            frame: FrameHeaderParser::new(),
            remaining: 0,
            auth: Matcher::new(),
            calibration: None,
        }
    }

    /// Stage that runs on the next step
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Retry delay currently in force
    pub fn backoff(&self) -> Option<Backoff> {
        self.backoff
    }

    /// Speed mapping derived on the last pass through calibration
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.stage == Stage::Steady && self.backoff.is_none()
    }

    /// Advance the connection as far as possible without blocking
    pub fn step<H: Host + ?Sized>(&mut self, host: &mut H) -> Progress {
        if let Some(backoff) = self.backoff {
            if host.now_secs() < backoff.until {
                return Progress::Working;
            }
            debug!("backoff {} expired", backoff.kind);
            self.backoff = None;
        }

        if self.stage >= Stage::SocketConnect && !host.association_status().is_up() {
            host.log("\r\nLost connection to network");
            self.stage = Stage::NetworkConnect;
        } else if self.stage == Stage::Steady && !host.connection_status().is_up() {
            self.fail(host, BackoffKind::SocketFailed, "\r\nLost connection to host");
            return Progress::Failed;
        }

        loop {
            let flow = match self.stage {
                Stage::NetworkConnect => self.network_connect(host),
                Stage::NetworkAwait => self.network_await(host),
                Stage::SocketConnect => self.socket_connect(host),
                Stage::SocketAwait => self.socket_await(host),
                Stage::HandshakeSend => self.handshake_send(host),
                Stage::StatusLineRead => self.status_line_read(host),
                Stage::HeaderRead => self.header_read(host),
                Stage::AuthSend => self.auth_send(host),
                Stage::AuthOpcodeRead => self.auth_opcode_read(host),
                Stage::AuthLengthRead => self.auth_length_read(host),
                Stage::AuthPayloadRead => self.auth_payload_read(host),
                Stage::DeriveCalibration => self.derive_calibration(host),
                Stage::Steady => return Progress::Connected,
            };

            match flow {
                Flow::Advance => self.stage = self.stage.next(),
                Flow::Suspend => return Progress::Working,
                Flow::Failed => return Progress::Failed,
            }
        }
    }

    fn fail<H: LogSink + Clock + ?Sized>(
        &mut self,
        host: &mut H,
        kind: BackoffKind,
        message: &str,
    ) -> Flow {
        warn!("stage {} failed", self.stage);
        host.log(message);
        self.backoff = Some(Backoff {
            kind,
            until: host.now_secs().saturating_add(self.timing.failed_delay),
        });
        self.stage = kind.resume_stage();
        Flow::Failed
    }

    fn arm_deadline<H: Clock + ?Sized>(&mut self, host: &H) {
        self.deadline = host.now_secs().saturating_add(self.timing.connecting_timeout);
    }

    /// Print one progress dot per second; false once the deadline has passed
    fn tick<H: LogSink + Clock + ?Sized>(&mut self, host: &mut H) -> bool {
        let now = host.now_secs();
        if now > self.deadline {
            return false;
        }
        if self.last_tick != Some(now) {
            self.last_tick = Some(now);
            host.log(".");
        }
        true
    }

    /// Nothing to read from the socket
    fn no_data<H: Host + ?Sized>(&mut self, host: &mut H, awaiting_first_byte: bool) -> Flow {
        if !host.connection_status().is_up() {
            return self.fail(host, BackoffKind::SocketFailed, "\r\nConnection to host closed");
        }
        if awaiting_first_byte {
            if self.tick(host) {
                return Flow::Suspend;
            }
            return self.fail(
                host,
                BackoffKind::SocketFailed,
                "\r\nDid not get a response from the server",
            );
        }
        if host.now_secs() >= self.deadline {
            return self.fail(
                host,
                BackoffKind::SocketFailed,
                "\r\nResponse from server ended prematurely",
            );
        }
        Flow::Suspend
    }

    fn network_connect<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        let ssid = read_text(host, FieldId::Ssid);
        let key = read_text(host, FieldId::SsidKey);
        logf!(host, "\r\nConnecting to SSID: {}...", ssid);
        self.arm_deadline(host);
        host.associate(&ssid, &key);
        Flow::Advance
    }

    fn network_await<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        match host.association_status() {
            LinkStatus::Success => {
                host.log("\r\nNetwork connection established");
                Flow::Advance
            }
            LinkStatus::Working if self.tick(host) => Flow::Suspend,
            _ => self.fail(
                host,
                BackoffKind::NetworkFailed,
                "\r\nFailed to connect to network",
            ),
        }
    }

    fn socket_connect<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        let server = read_text(host, FieldId::Host);
        let port = read_unsigned(host, FieldId::Port);
        logf!(host, "\r\nConnecting to host: {}:{}...", server, port);
        self.arm_deadline(host);
        host.open(&server, port);
        Flow::Advance
    }

    fn socket_await<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        match host.connection_status() {
            LinkStatus::Success => Flow::Advance,
            LinkStatus::Working if self.tick(host) => Flow::Suspend,
            _ => self.fail(host, BackoffKind::SocketFailed, "\r\nFailed to connect to host"),
        }
    }

    fn handshake_send<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        let path = read_text(host, FieldId::Path);
        let server = read_text(host, FieldId::Host);
        logf!(host, "\r\nAccessing WebSocket server at {}...", path);

        let prepared = WebSocketKey::generate(host).and_then(|key| {
            let request = upgrade_request(&path, &server, &key)?;
            Ok::<_, HandshakeError>((request, key.accept_value()?))
        });
        let (request, accept) = match prepared {
            Ok(prepared) => prepared,
            Err(_) => {
                return self.fail(
                    host,
                    BackoffKind::SocketFailed,
                    "\r\nWebSocket request could not be built",
                )
            }
        };

        // Leftovers from an earlier connection must not be read as the response
        while host.read_byte().is_some() {}
        host.send(request.as_bytes());

        self.status = StatusLine::default();
        self.headers = HeaderScan::new(&accept);
        self.arm_deadline(host);
        Flow::Advance
    }

    fn status_line_read<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        loop {
            let Some(byte) = host.read_byte() else {
                if self.status.is_mismatch() {
                    return self.fail(host, BackoffKind::SocketFailed, UNEXPECTED_STATUS);
                }
                let first = self.status.received == 0;
                return self.no_data(host, first);
            };

            if self.status.received == 0 {
                host.log("\r\n\t");
            }
            echo_response(host, byte);

            match self.status.feed(byte) {
                StatusOutcome::Pending => {}
                StatusOutcome::Accepted => return Flow::Advance,
                StatusOutcome::Rejected => {
                    return self.fail(host, BackoffKind::SocketFailed, UNEXPECTED_STATUS)
                }
            }
        }
    }

    fn header_read<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        while let Some(byte) = host.read_byte() {
            echo_response(host, byte);
            if self.headers.feed(byte) {
                break;
            }
        }

        if !self.headers.is_complete() {
            return self.no_data(host, false);
        }

        match self.headers.verdict() {
            Ok(()) => {
                host.log("\r\nWebSocket connection established");
                Flow::Advance
            }
            Err(error) => self.fail(host, BackoffKind::SocketFailed, error.message()),
        }
    }

    fn auth_send<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        let proj = read_text(host, FieldId::Proj);
        let key = read_text(host, FieldId::ProjKey);
        logf!(host, "\r\nConnecting to project: {}...", proj);

        let message = CoreMessage::Auth {
            id: &proj,
            key: &key,
        };
        if let Err(error) = send_message(host, &message) {
            return self.fail(host, BackoffKind::SocketFailed, frame_error_message(error));
        }

        self.frame.reset();
        self.arm_deadline(host);
        Flow::Advance
    }

    fn auth_opcode_read<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        let Some(byte) = host.read_byte() else {
            return self.no_data(host, true);
        };
        match self.frame.feed(byte) {
            Ok(_) => Flow::Advance,
            Err(error) => self.fail(host, BackoffKind::SocketFailed, frame_error_message(error)),
        }
    }

    fn auth_length_read<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        loop {
            let Some(byte) = host.read_byte() else {
                return self.no_data(host, false);
            };
            match self.frame.feed(byte) {
                Ok(None) => {}
                Ok(Some(len)) => {
                    self.remaining = len;
                    self.auth.reset();
                    host.log("\r\nReceived authentication response:\r\n\t");
                    return Flow::Advance;
                }
                Err(error) => {
                    return self.fail(host, BackoffKind::SocketFailed, frame_error_message(error))
                }
            }
        }
    }

    fn auth_payload_read<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        while self.remaining > 0 {
            let Some(byte) = host.read_byte() else {
                return self.no_data(host, false);
            };
            self.remaining -= 1;
            echo_response(host, byte);
            // Whitespace is insignificant in the JSON reply
            if byte > b' ' {
                self.auth.feed(byte, AUTH_SUCCESS_MARKER, 0);
            }
        }

        if !self.auth.is_matched() {
            return self.fail(host, BackoffKind::SocketFailed, "\r\nAuthentication failed");
        }
        host.log("\r\nAuthenticated");
        Flow::Advance
    }

    fn derive_calibration<H: Host + ?Sized>(&mut self, host: &mut H) -> Flow {
        let settings = CalibrationSettings::read(host);
        settings.log(host);
        self.calibration = Some(Calibration::derive(&settings));
        Flow::Advance
    }
}

fn frame_error_message(error: FrameError) -> &'static str {
    match error {
        FrameError::UnsupportedFrame(_) => {
            "\r\nReceived response data is either not a WebSocket frame or uses an unsupported WebSocket feature"
        }
        FrameError::MaskedFrame => "\r\nReceived a masked frame which is not allowed",
        FrameError::TooLong | FrameError::PayloadTooLarge | FrameError::BufferTooSmall => {
            "\r\nWebSocket frame was unexpectedly long"
        }
    }
}

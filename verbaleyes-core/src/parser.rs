//! Streaming configuration parser
//!
//! Settings arrive one character at a time as `key=value` lines (a tab may
//! replace `=`). A blank line ends the update and commits storage:
//!
//! ```text
//! ssid=office\n
//! port=8080\n
//! \n
//! ```
//!
//! Each value is streamed straight into storage while it is typed, so the
//! parser needs no line buffer. Every accepted character is echoed to the
//! log, which doubles as the user interface on a serial terminal.

use crate::config::fields::{FieldId, FieldKind, FIELD_COUNT};
use crate::connection::Rewind;
use crate::log::{echo, logf};
use crate::timing::Timing;
use verbaleyes_hal::{Clock, ConfigStorage, LogSink};

#[cfg(feature = "defmt")]
use defmt::{debug, trace};

// Stub macros when defmt is not available
#[cfg(not(feature = "defmt"))]
macro_rules! debug {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "defmt"))]
macro_rules! trace {
    ($($arg:tt)*) => {{}};
}

/// Aborts the current line like a newline
const ESCAPE: u8 = 0x1B;
const DELETE: u8 = 0x7F;
const BACKSPACE: u8 = 0x08;
const FORM_FEED: u8 = 0x0C;
const VERTICAL_TAB: u8 = 0x0B;

/// Candidate fields still matching the key typed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidates(u16);

impl Candidates {
    const ALL: Candidates = Candidates((1 << FIELD_COUNT) - 1);

    /// Drop every field whose name does not have `byte` at `position`
    fn eliminate(&mut self, position: usize, byte: u8) {
        for id in FieldId::ALL {
            if id.field().name.as_bytes().get(position) != Some(&byte) {
                self.0 &= !(1 << id.index());
            }
        }
    }

    /// Surviving field whose name is exactly `len` bytes long
    fn exact(self, len: usize) -> Option<FieldId> {
        FieldId::ALL
            .into_iter()
            .find(|id| self.0 & (1 << id.index()) != 0 && id.field().name.len() == len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// No update in progress
    Idle,
    /// Reading a key
    Key,
    /// Streaming the value of a matched field
    Value(FieldId),
}

/// Incremental `key=value` configuration parser
#[derive(Debug, Clone)]
pub struct ConfigParser {
    mode: Mode,
    candidates: Candidates,
    /// Characters consumed in the current key or value
    cursor: u16,
    /// Digits of an integer value, without sign
    number: u16,
    negative: bool,
    /// Rest of the current line is ignored
    failed: bool,
    /// A value was stored and storage still needs a commit
    pending_commit: bool,
    deadline: u64,
    timeout: u64,
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new(&Timing::default())
    }
}

impl ConfigParser {
    pub fn new(timing: &Timing) -> Self {
        Self {
            mode: Mode::Idle,
            candidates: Candidates::ALL,
            cursor: 0,
            number: 0,
            negative: false,
            failed: false,
            pending_commit: false,
            deadline: 0,
            timeout: timing.config_timeout,
        }
    }

    /// Check if an update is in progress
    pub fn is_active(&self) -> bool {
        self.mode != Mode::Idle
    }

    /// Check if stored values are waiting for the closing blank line
    pub fn has_pending_commit(&self) -> bool {
        self.pending_commit
    }

    /// Feed one input character, or `None` when no input is available
    ///
    /// Returns true while the caller should keep feeding the parser. A NUL
    /// byte counts as no input. When no input arrives for the configured
    /// timeout, the open line is closed as if a newline had been received.
    pub fn feed<H, R>(&mut self, host: &mut H, link: &mut R, input: Option<u8>) -> bool
    where
        H: ConfigStorage + LogSink + Clock + ?Sized,
        R: Rewind + ?Sized,
    {
        match input {
            None | Some(0) => {
                if !self.is_active() {
                    return false;
                }
                if host.now_secs() < self.deadline {
                    return true;
                }
                debug!("config input timed out");
                self.terminate(host, link)
            }
            Some(b'\n' | ESCAPE) => self.terminate(host, link),
            Some(b'\r' | DELETE | BACKSPACE | FORM_FEED | VERTICAL_TAB) => self.is_active(),
            Some(b'=' | b'\t') if !matches!(self.mode, Mode::Value(_)) => self.delimiter(host),
            Some(byte) => {
                match self.mode {
                    Mode::Idle | Mode::Key => self.key_char(host, byte),
                    Mode::Value(id) => self.value_char(host, id, byte),
                }
                self.touch(host);
                true
            }
        }
    }

    fn touch<H: Clock + ?Sized>(&mut self, host: &H) {
        self.deadline = host.now_secs().saturating_add(self.timeout);
    }

    fn reset_line(&mut self) {
        self.candidates = Candidates::ALL;
        self.cursor = 0;
        self.number = 0;
        self.negative = false;
        self.failed = false;
    }

    fn key_char<H: LogSink + ?Sized>(&mut self, host: &mut H, byte: u8) {
        if self.failed {
            return;
        }

        if self.cursor == 0 {
            if self.mode == Mode::Idle {
                self.mode = Mode::Key;
                self.reset_line();
            }
            if byte == b'#' {
                trace!("comment line");
                self.failed = true;
                return;
            }
            host.log("\r\n[ ");
        }

        self.candidates.eliminate(self.cursor as usize, byte);
        self.cursor = self.cursor.saturating_add(1);
        echo(host, byte);
    }

    fn delimiter<H: LogSink + Clock + ?Sized>(&mut self, host: &mut H) -> bool {
        if self.mode == Mode::Idle {
            // An empty key still opens an update
            self.mode = Mode::Key;
            self.reset_line();
        }
        self.touch(host);
        if self.failed {
            return true;
        }

        match self.candidates.exact(self.cursor as usize) {
            Some(id) => {
                debug!("matched key {}", id);
                self.reset_line();
                self.mode = Mode::Value(id);
                host.log(" ] is now: ");
            }
            None => {
                if self.cursor == 0 {
                    host.log("\r\n[");
                }
                host.log(" ] No matching key");
                self.candidates = Candidates::ALL;
                self.failed = true;
            }
        }
        true
    }

    fn value_char<H: ConfigStorage + LogSink + ?Sized>(
        &mut self,
        host: &mut H,
        id: FieldId,
        byte: u8,
    ) {
        let field = id.field();
        match field.kind {
            FieldKind::Text { max_len } => {
                if self.cursor < max_len {
                    host.write(field.offset + self.cursor, byte);
                    self.cursor += 1;
                    echo(host, byte);
                } else if !self.failed {
                    self.failed = true;
                    host.log("\r\nMaximum input length reached");
                }
            }
            kind => self.integer_char(host, kind, byte),
        }
    }

    fn integer_char<H: LogSink + ?Sized>(&mut self, host: &mut H, kind: FieldKind, byte: u8) {
        if self.failed {
            // Digits after a clamp are shown but do not change the value
            if byte.is_ascii_digit() {
                echo(host, byte);
            }
            return;
        }

        if !byte.is_ascii_digit() {
            if byte == b'-' && kind == FieldKind::Signed && self.cursor == 0 && !self.negative {
                self.negative = true;
                host.log("-");
                return;
            }
            if self.cursor == 0 {
                host.log("0");
            }
            logf!(host, "\r\nInvalid input ({})", char::from(byte));
            self.failed = true;
            return;
        }

        let digit = u16::from(byte - b'0');
        if self.cursor >= 4 {
            let (limit, last_digit, max) = match kind {
                FieldKind::Signed => (3276, 7, i16::MAX as u16),
                _ => (6553, 5, u16::MAX),
            };
            if self.number > limit || (self.number == limit && digit > last_digit) {
                self.failed = true;
                self.number = max;
                let message = match (kind, self.negative) {
                    (FieldKind::Signed, true) => {
                        "Value was too low and clamped up to minimum value of -32767"
                    }
                    (FieldKind::Signed, false) => {
                        "Value was too high and clamped down to maximum value of 32767"
                    }
                    _ => "Value was too high and clamped down to maximum value of 65535",
                };
                logf!(host, "{}\r\n{}", char::from(byte), message);
                return;
            }
        }

        self.number = self.number * 10 + digit;
        self.cursor = self.cursor.saturating_add(1);
        echo(host, byte);
    }

    /// Handle a line terminator (newline, escape or input timeout)
    fn terminate<H, R>(&mut self, host: &mut H, link: &mut R) -> bool
    where
        H: ConfigStorage + LogSink + Clock + ?Sized,
        R: Rewind + ?Sized,
    {
        match self.mode {
            Mode::Idle => false,
            Mode::Value(id) => {
                self.store_value(host, id);
                link.rewind_to(id.field().resume);
                self.reset_line();
                self.mode = Mode::Key;
                self.pending_commit = true;
                self.touch(host);
                true
            }
            Mode::Key if self.failed || self.cursor != 0 => {
                if !self.failed {
                    host.log(" ] Aborted");
                }
                self.reset_line();
                if !self.pending_commit {
                    self.mode = Mode::Idle;
                }
                true
            }
            Mode::Key => {
                self.commit(host);
                true
            }
        }
    }

    fn store_value<H: ConfigStorage + ?Sized>(&mut self, host: &mut H, id: FieldId) {
        let field = id.field();
        match field.kind {
            FieldKind::Text { max_len } => {
                if self.cursor < max_len {
                    host.write(field.offset + self.cursor, 0);
                }
            }
            FieldKind::Unsigned | FieldKind::Signed => {
                let value = if self.negative {
                    self.number.wrapping_neg()
                } else {
                    self.number
                };
                let [high, low] = value.to_be_bytes();
                host.write(field.offset, high);
                host.write(field.offset + 1, low);
            }
        }
    }

    fn commit<H: ConfigStorage + LogSink + ?Sized>(&mut self, host: &mut H) {
        match host.commit() {
            Ok(()) => host.log("\r\nDone\r\n"),
            Err(_) => host.log("\r\nFailed to save configuration"),
        }
        self.pending_commit = false;
        self.reset_line();
        self.mode = Mode::Idle;
    }
}

//! Incremental validation of the server's upgrade response

use heapless::Vec;
use verbaleyes_protocol::{Matcher, ACCEPT_LEN};

/// Status line prefix of a successful upgrade, compared case-insensitively
pub const STATUS_PREFIX: &[u8] = b"http/1.1 101";

const END_OF_HEADERS: &[u8] = b"\r\n\r\n";
const CONNECTION_UPGRADE: &[u8] = b"\nconnection: upgrade\r\n";
const UPGRADE_WEBSOCKET: &[u8] = b"\nupgrade: websocket\r\n";
const ACCEPT_NAME: &[u8] = b"\nsec-websocket-accept: ";
const EXTENSIONS_NAME: &[u8] = b"\nsec-websocket-extensions:";
const PROTOCOL_NAME: &[u8] = b"\nsec-websocket-protocol:";

const ACCEPT_PATTERN_LEN: usize = ACCEPT_NAME.len() + ACCEPT_LEN + 2;

/// Progress through the status line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusLine {
    /// Bytes received so far
    pub received: u16,
    matched: usize,
    mismatch: bool,
}

/// Result of feeding one status line byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Prefix still matching, or mismatch waiting for the end of line
    Pending,
    /// Full prefix matched
    Accepted,
    /// Line ended after a mismatch
    Rejected,
}

impl StatusLine {
    pub fn feed(&mut self, byte: u8) -> StatusOutcome {
        self.received = self.received.saturating_add(1);
        if !self.mismatch {
            if byte.to_ascii_lowercase() == STATUS_PREFIX[self.matched] {
                self.matched += 1;
                if self.matched == STATUS_PREFIX.len() {
                    return StatusOutcome::Accepted;
                }
                return StatusOutcome::Pending;
            }
            self.mismatch = true;
        }
        if byte == b'\n' {
            StatusOutcome::Rejected
        } else {
            StatusOutcome::Pending
        }
    }

    /// Check if a byte already failed to match
    pub fn is_mismatch(&self) -> bool {
        self.mismatch
    }
}

/// Header problems, in the order they are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderError {
    NotAnUpgrade,
    BadAccept,
    UnexpectedExtension,
    UnexpectedProtocol,
}

impl HeaderError {
    /// Diagnostic shown to the user
    pub fn message(self) -> &'static str {
        match self {
            HeaderError::NotAnUpgrade => {
                "\r\nHTTP response is not an upgrade to the WebSockets protocol"
            }
            HeaderError::BadAccept => "\r\nMissing or incorrect WebSocket accept header",
            HeaderError::UnexpectedExtension => "\r\nUnexpected WebSocket Extension header",
            HeaderError::UnexpectedProtocol => "\r\nUnexpected WebSocket Protocol header",
        }
    }
}

/// Scans response headers for the required and forbidden entries
///
/// Header names compare case-insensitively, the accept value exactly.
#[derive(Debug, Clone)]
pub struct HeaderScan {
    accept: Vec<u8, ACCEPT_PATTERN_LEN>,
    end: Matcher,
    connection: Matcher,
    upgrade: Matcher,
    accept_seen: Matcher,
    extensions: Matcher,
    protocol: Matcher,
}

impl Default for HeaderScan {
    fn default() -> Self {
        Self::new(&[0; ACCEPT_LEN])
    }
}

impl HeaderScan {
    /// Prepare a scan expecting `accept` as the `Sec-WebSocket-Accept` value
    pub fn new(accept: &[u8; ACCEPT_LEN]) -> Self {
        let mut pattern = Vec::new();
        // Capacity is the exact pattern length
        let _ = pattern.extend_from_slice(ACCEPT_NAME);
        let _ = pattern.extend_from_slice(accept);
        let _ = pattern.extend_from_slice(b"\r\n");
        Self {
            accept: pattern,
            end: Matcher::new(),
            connection: Matcher::new(),
            upgrade: Matcher::new(),
            accept_seen: Matcher::new(),
            extensions: Matcher::new(),
            protocol: Matcher::new(),
        }
    }

    /// Feed one header byte; returns true at the blank line ending the headers
    pub fn feed(&mut self, byte: u8) -> bool {
        self.connection.feed_ignore_case(byte, CONNECTION_UPGRADE);
        self.upgrade.feed_ignore_case(byte, UPGRADE_WEBSOCKET);
        self.accept_seen.feed(byte, &self.accept, ACCEPT_NAME.len());
        self.extensions.feed_ignore_case(byte, EXTENSIONS_NAME);
        self.protocol.feed_ignore_case(byte, PROTOCOL_NAME);
        self.end.feed(byte, END_OF_HEADERS, 0)
    }

    /// Check if the blank line has been seen
    pub fn is_complete(&self) -> bool {
        self.end.is_matched()
    }

    /// Validate what was seen, first violated condition wins
    pub fn verdict(&self) -> Result<(), HeaderError> {
        if !self.connection.is_matched() || !self.upgrade.is_matched() {
            Err(HeaderError::NotAnUpgrade)
        } else if !self.accept_seen.is_matched() {
            Err(HeaderError::BadAccept)
        } else if self.extensions.is_matched() {
            Err(HeaderError::UnexpectedExtension)
        } else if self.protocol.is_matched() {
            Err(HeaderError::UnexpectedProtocol)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPT: &[u8; ACCEPT_LEN] = b"s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

    fn status(line: &[u8]) -> StatusOutcome {
        let mut status = StatusLine::default();
        let mut outcome = StatusOutcome::Pending;
        for &b in line {
            outcome = status.feed(b);
            if outcome != StatusOutcome::Pending {
                break;
            }
        }
        outcome
    }

    fn scan(headers: &[u8]) -> HeaderScan {
        let mut scan = HeaderScan::new(ACCEPT);
        for &b in headers {
            if scan.feed(b) {
                break;
            }
        }
        scan
    }

    #[test]
    fn test_status_line() {
        assert_eq!(status(b"HTTP/1.1 101 Switching"), StatusOutcome::Accepted);
        assert_eq!(status(b"http/1.1 101"), StatusOutcome::Accepted);
        assert_eq!(status(b"HTTP/1.1 404 Not Found\r\n"), StatusOutcome::Rejected);
        assert_eq!(status(b"HTTP/1.0 101"), StatusOutcome::Pending);
    }

    #[test]
    fn test_valid_headers() {
        let scan = scan(
            b" Switching Protocols\r\n\
              Upgrade: WebSocket\r\n\
              CONNECTION: upgrade\r\n\
              Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n",
        );
        assert!(scan.is_complete());
        assert_eq!(scan.verdict(), Ok(()));
    }

    #[test]
    fn test_accept_value_is_case_sensitive() {
        let scan = scan(
            b"\r\nUpgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Accept: S3PPLMBITXAQ9KYGZZHZRBK+XOO=\r\n\r\n",
        );
        assert_eq!(scan.verdict(), Err(HeaderError::BadAccept));
    }

    #[test]
    fn test_verdict_order() {
        let missing = scan(b"\r\nUpgrade: websocket\r\n\r\n");
        assert_eq!(missing.verdict(), Err(HeaderError::NotAnUpgrade));

        let extension = scan(
            b"\r\nUpgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Protocol: chat\r\n\
              Sec-WebSocket-Extensions: deflate\r\n\
              Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n",
        );
        assert_eq!(extension.verdict(), Err(HeaderError::UnexpectedExtension));

        let protocol = scan(
            b"\r\nUpgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Protocol: chat\r\n\
              Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n",
        );
        assert_eq!(protocol.verdict(), Err(HeaderError::UnexpectedProtocol));
    }

    #[test]
    fn test_header_names_anchored_to_line_start() {
        let scan = scan(
            b"\r\nX-Upgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n",
        );
        assert_eq!(scan.verdict(), Err(HeaderError::NotAnUpgrade));
    }
}

//! Keyboard input
//!
//! Arrow keys stand in for the board's controls; everything else is
//! configuration input.

use std::io::{self, Read};
use std::sync::mpsc::Sender;
use std::thread;

const ESCAPE: u8 = 0x1B;

/// One decoded key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Character for the configuration parser
    Config(u8),
    /// `ESC [ A`
    PotUp,
    /// `ESC [ B`
    PotDown,
    /// `ESC [ C`
    OffsetButton,
}

/// Splits arrow key escape sequences out of the input stream
#[derive(Debug, Default)]
pub struct KeyDecoder {
    /// Bytes of an escape sequence seen so far
    pending: Vec<u8>,
}

impl KeyDecoder {
    pub fn push(&mut self, byte: u8, keys: &mut Vec<Key>) {
        match (self.pending.as_slice(), byte) {
            ([], ESCAPE) => self.pending.push(byte),
            ([ESCAPE], b'[') => self.pending.push(byte),
            ([ESCAPE, b'['], b'A' | b'B' | b'C') => {
                self.pending.clear();
                keys.push(match byte {
                    b'A' => Key::PotUp,
                    b'B' => Key::PotDown,
                    _ => Key::OffsetButton,
                });
            }
            ([], _) => keys.push(Key::Config(byte)),
            _ => {
                // Not an arrow key: replay what was held back
                self.flush(keys);
                self.push(byte, keys);
            }
        }
    }

    /// Release a held back partial sequence, such as a lone escape
    pub fn flush(&mut self, keys: &mut Vec<Key>) {
        keys.extend(self.pending.drain(..).map(Key::Config));
    }
}

/// Forward decoded keys from stdin until it closes
pub fn spawn_stdin_reader(tx: Sender<Key>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        let mut decoder = KeyDecoder::default();
        let mut buf = [0u8; 64];
        let mut keys = Vec::new();
        loop {
            let n = match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    tracing::warn!(%error, "stdin read failed");
                    break;
                }
            };
            for &byte in &buf[..n] {
                decoder.push(byte, &mut keys);
            }
            // A sequence never spans two reads from a terminal
            decoder.flush(&mut keys);
            for key in keys.drain(..) {
                if tx.send(key).is_err() {
                    return;
                }
            }
        }
        tracing::debug!("stdin closed");
    })
}

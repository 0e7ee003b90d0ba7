//! Scripted host for tests
//!
//! Storage is a plain array, the clock only moves when a test sets `now`,
//! and the socket answers each `send` with the next queued [`Reply`].

use crate::config::{write_integer, write_text, FieldId, CONFIG_LEN};
use std::collections::VecDeque;
use std::format;
use std::string::String;
use std::vec::Vec;
use verbaleyes_hal::{
    Clock, ConfigStorage, LinkStatus, LogSink, Network, RngCore, Socket, StorageError,
};
use verbaleyes_protocol::handshake::accept_value;

const KEY_HEADER: &[u8] = b"Sec-WebSocket-Key: ";

/// Server answer to one client send
pub enum Reply {
    /// `101 Switching Protocols` with the correct accept value for the
    /// request's key, followed by extra header lines
    Upgrade(&'static str),
    /// Raw bytes
    Bytes(Vec<u8>),
}

pub struct MockHost {
    pub storage: [u8; CONFIG_LEN as usize],
    /// Offsets written, in order
    pub writes: Vec<u16>,
    pub commits: usize,
    pub fail_commit: bool,
    pub log: String,
    pub now: u64,
    pub network: LinkStatus,
    /// Network status right after `associate`
    pub network_on_associate: LinkStatus,
    pub socket: LinkStatus,
    /// Socket status right after `open`
    pub socket_on_open: LinkStatus,
    pub associations: Vec<(String, String)>,
    pub opens: Vec<(String, u16)>,
    pub rx: VecDeque<u8>,
    pub replies: VecDeque<Reply>,
    pub sent: Vec<Vec<u8>>,
    /// Bytes left waiting at the start of every new socket
    pub stale_on_open: Vec<u8>,
    /// Trailing bytes of each reply withheld until `release_held`
    pub hold_back: usize,
    held: Vec<u8>,
    rng: u8,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            storage: [0; CONFIG_LEN as usize],
            writes: Vec::new(),
            commits: 0,
            fail_commit: false,
            log: String::new(),
            now: 0,
            network: LinkStatus::Fail,
            network_on_associate: LinkStatus::Success,
            socket: LinkStatus::Fail,
            socket_on_open: LinkStatus::Success,
            associations: Vec::new(),
            opens: Vec::new(),
            rx: VecDeque::new(),
            replies: VecDeque::new(),
            sent: Vec::new(),
            stale_on_open: Vec::new(),
            hold_back: 0,
            held: Vec::new(),
            rng: 0,
        }
    }

    /// Host with every setting filled in
    pub fn configured() -> Self {
        let mut host = Self::new();
        for (id, text) in [
            (FieldId::Ssid, "aaa"),
            (FieldId::SsidKey, "bbb"),
            (FieldId::Host, "ccc"),
            (FieldId::Path, "ddd"),
            (FieldId::Proj, "eee"),
            (FieldId::ProjKey, "fff"),
        ] {
            write_text(&mut host, id, text);
        }
        for (id, value) in [
            (FieldId::Port, 1111),
            (FieldId::SpeedMax, 2222),
            (FieldId::SpeedMin, 3333),
            (FieldId::Deadzone, 4444),
            (FieldId::CalLow, 5555),
            (FieldId::CalHigh, 6666),
            (FieldId::Sensitivity, 7777),
        ] {
            write_integer(&mut host, id, value);
        }
        host.writes.clear();
        host
    }

    /// Deliver everything withheld by `hold_back` and stop withholding
    pub fn release_held(&mut self) {
        self.hold_back = 0;
        self.rx.extend(self.held.drain(..));
    }

    fn deliver(&mut self, bytes: Vec<u8>) {
        let split = bytes.len().saturating_sub(self.hold_back);
        self.rx.extend(&bytes[..split]);
        self.held.extend(&bytes[split..]);
    }
}

impl ConfigStorage for MockHost {
    fn read(&mut self, offset: u16) -> u8 {
        self.storage.get(offset as usize).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, offset: u16, byte: u8) {
        self.writes.push(offset);
        if let Some(slot) = self.storage.get_mut(offset as usize) {
            *slot = byte;
        }
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.fail_commit {
            return Err(StorageError::Device);
        }
        self.commits += 1;
        Ok(())
    }
}

impl Network for MockHost {
    fn associate(&mut self, ssid: &str, key: &str) {
        self.associations.push((ssid.into(), key.into()));
        self.network = self.network_on_associate;
    }

    fn association_status(&mut self) -> LinkStatus {
        self.network
    }
}

impl Socket for MockHost {
    fn open(&mut self, host: &str, port: u16) {
        self.opens.push((host.into(), port));
        self.socket = self.socket_on_open;
        self.rx.clear();
        self.held.clear();
        self.rx.extend(&self.stale_on_open);
    }

    fn connection_status(&mut self) -> LinkStatus {
        self.socket
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn send(&mut self, data: &[u8]) {
        self.sent.push(data.to_vec());
        match self.replies.pop_front() {
            Some(Reply::Upgrade(extra)) => {
                let response = upgrade_response(data, extra);
                self.deliver(response);
            }
            Some(Reply::Bytes(bytes)) => self.deliver(bytes),
            None => {}
        }
    }
}

impl LogSink for MockHost {
    fn log(&mut self, text: &str) {
        self.log.push_str(text);
    }
}

impl Clock for MockHost {
    fn now_secs(&self) -> u64 {
        self.now
    }
}

impl RngCore for MockHost {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            self.rng = self.rng.wrapping_mul(31).wrapping_add(17);
            *byte = self.rng;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Compliant upgrade response to `request`
pub fn upgrade_response(request: &[u8], extra: &str) -> Vec<u8> {
    let start = request
        .windows(KEY_HEADER.len())
        .position(|window| window == KEY_HEADER)
        .expect("request carries a key")
        + KEY_HEADER.len();
    let accept = accept_value(&request[start..start + 24]).expect("valid key");
    let accept = core::str::from_utf8(&accept).expect("base64 is ASCII");
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\
         {extra}\r\n"
    )
    .into_bytes()
}

/// Unmasked text frame as a server sends it
pub fn server_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = std::vec![0x81];
    if payload.len() > 125 {
        frame.push(126);
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    } else {
        frame.push(payload.len() as u8);
    }
    frame.extend_from_slice(payload);
    frame
}

/// Payload of a masked client text frame
pub fn unmask_client_frame(frame: &[u8]) -> Vec<u8> {
    assert_eq!(frame[0], 0x81);
    assert!(frame[1] & 0x80 != 0, "client frames are masked");
    let (len, mask_at) = match frame[1] & 0x7F {
        126 => (u16::from_be_bytes([frame[2], frame[3]]) as usize, 4),
        len => (len as usize, 2),
    };
    let mask = &frame[mask_at..mask_at + 4];
    let payload = &frame[mask_at + 4..];
    assert_eq!(payload.len(), len);
    payload
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ mask[i % 4])
        .collect()
}

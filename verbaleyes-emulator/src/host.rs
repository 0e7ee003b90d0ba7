//! Desktop implementations of the board collaborators

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;
use verbaleyes_core::config::{write_integer, write_text, FieldId, CONFIG_LEN};
use verbaleyes_hal::{Clock, ConfigStorage, LinkStatus, LogSink, Network, Socket, StorageError};

/// Configuration area backed by a file, written on commit
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl FileStorage {
    /// Load `path`, creating it with development defaults if it does not exist
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        match fs::read(path) {
            Ok(mut bytes) => {
                if bytes.len() != CONFIG_LEN as usize {
                    tracing::warn!(
                        len = bytes.len(),
                        expected = CONFIG_LEN,
                        "configuration file has unexpected size"
                    );
                }
                bytes.resize(CONFIG_LEN as usize, 0);
                Ok(Self {
                    path: path.to_owned(),
                    bytes,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let mut storage = Self {
                    path: path.to_owned(),
                    bytes: vec![0; CONFIG_LEN as usize],
                };
                storage.load_defaults();
                fs::write(path, &storage.bytes)
                    .with_context(|| format!("creating {}", path.display()))?;
                tracing::info!(path = %path.display(), "created configuration with defaults");
                Ok(storage)
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn load_defaults(&mut self) {
        write_text(self, FieldId::Ssid, "myWifi");
        write_text(self, FieldId::SsidKey, "password123");
        write_text(self, FieldId::Host, "127.0.0.1");
        write_integer(self, FieldId::Port, 8080);
        write_text(self, FieldId::Path, "/");
    }
}

impl ConfigStorage for FileStorage {
    fn read(&mut self, offset: u16) -> u8 {
        self.bytes.get(offset as usize).copied().unwrap_or(0)
    }

    fn write(&mut self, offset: u16, byte: u8) {
        if let Some(slot) = self.bytes.get_mut(offset as usize) {
            *slot = byte;
        }
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        fs::write(&self.path, &self.bytes).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to save configuration");
            StorageError::Device
        })
    }
}

/// TCP socket that connects in the background and reads without blocking
#[derive(Debug)]
pub struct TcpSocket {
    stream: Option<TcpStream>,
    connecting: Option<Receiver<io::Result<TcpStream>>>,
    status: LinkStatus,
}

impl Default for TcpSocket {
    fn default() -> Self {
        Self {
            stream: None,
            connecting: None,
            status: LinkStatus::Fail,
        }
    }
}

impl TcpSocket {
    fn broken(&mut self, error: io::Error) {
        tracing::warn!(%error, "socket error");
        self.stream = None;
        self.status = LinkStatus::Fail;
    }

    fn poll_connect(&mut self) {
        let Some(connecting) = &self.connecting else {
            return;
        };
        match connecting.try_recv() {
            Ok(Ok(stream)) => {
                self.connecting = None;
                if let Err(error) = stream.set_nonblocking(true) {
                    self.broken(error);
                    return;
                }
                // Frames are small and latency matters more than throughput
                let _ = stream.set_nodelay(true);
                tracing::debug!(peer = ?stream.peer_addr().ok(), "socket connected");
                self.stream = Some(stream);
                self.status = LinkStatus::Success;
            }
            Ok(Err(error)) => {
                self.connecting = None;
                self.broken(error);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.connecting = None;
                self.status = LinkStatus::Fail;
            }
        }
    }
}

impl Socket for TcpSocket {
    fn open(&mut self, host: &str, port: u16) {
        self.stream = None;
        self.status = LinkStatus::Working;

        let (tx, rx) = mpsc::channel();
        let host = host.to_owned();
        thread::spawn(move || {
            let _ = tx.send(TcpStream::connect((host.as_str(), port)));
        });
        self.connecting = Some(rx);
    }

    fn connection_status(&mut self) -> LinkStatus {
        self.poll_connect();
        self.status
    }

    fn read_byte(&mut self) -> Option<u8> {
        let stream = self.stream.as_mut()?;
        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(0) => {
                tracing::debug!("socket closed by peer");
                self.stream = None;
                self.status = LinkStatus::Fail;
                None
            }
            Ok(_) => Some(byte[0]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                self.broken(e);
                None
            }
        }
    }

    fn send(&mut self, data: &[u8]) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        if let Err(error) = write_blocking(stream, data) {
            self.broken(error);
        }
    }
}

/// Writes block like the board's socket driver does
fn write_blocking(stream: &mut TcpStream, data: &[u8]) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.write_all(data)?;
    stream.set_nonblocking(true)
}

/// Everything the controller needs from the board
pub struct EmulatedHost {
    storage: FileStorage,
    socket: TcpSocket,
    network: LinkStatus,
    rng: StdRng,
    started: Instant,
}

impl EmulatedHost {
    pub fn new(storage: FileStorage, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            storage,
            socket: TcpSocket::default(),
            network: LinkStatus::Fail,
            rng,
            started: Instant::now(),
        }
    }
}

impl ConfigStorage for EmulatedHost {
    fn read(&mut self, offset: u16) -> u8 {
        self.storage.read(offset)
    }

    fn write(&mut self, offset: u16, byte: u8) {
        self.storage.write(offset, byte);
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.storage.commit()
    }
}

impl Network for EmulatedHost {
    /// The desktop is always online; any configured network is accepted
    fn associate(&mut self, ssid: &str, _key: &str) {
        self.network = if ssid.is_empty() {
            LinkStatus::Fail
        } else {
            LinkStatus::Success
        };
        tracing::debug!(ssid, status = ?self.network, "emulated association");
    }

    fn association_status(&mut self) -> LinkStatus {
        self.network
    }
}

impl Socket for EmulatedHost {
    fn open(&mut self, host: &str, port: u16) {
        tracing::debug!(host, port, "opening socket");
        self.socket.open(host, port);
    }

    fn connection_status(&mut self) -> LinkStatus {
        self.socket.connection_status()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.socket.read_byte()
    }

    fn send(&mut self, data: &[u8]) {
        self.socket.send(data);
    }
}

impl LogSink for EmulatedHost {
    fn log(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

impl Clock for EmulatedHost {
    fn now_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

impl RngCore for EmulatedHost {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

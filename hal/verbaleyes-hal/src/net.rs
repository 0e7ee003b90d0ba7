//! Network and socket abstractions
//!
//! Both interfaces are poll based: starting an operation returns at once and
//! progress is observed through a status query on later calls.

/// Progress of an association or connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Still in progress
    Working,
    /// Established and usable
    Success,
    /// Rejected, dropped or never started
    Fail,
}

impl LinkStatus {
    /// Check if the link is established
    pub fn is_up(self) -> bool {
        self == LinkStatus::Success
    }
}

/// Wireless network interface
pub trait Network {
    /// Begin associating with the network `ssid` using `key`
    fn associate(&mut self, ssid: &str, key: &str);

    /// Current association status
    fn association_status(&mut self) -> LinkStatus;
}

/// Stream socket to the server
pub trait Socket {
    /// Begin connecting to `host`:`port`, dropping any previous connection
    fn open(&mut self, host: &str, port: u16);

    /// Current connection status
    fn connection_status(&mut self) -> LinkStatus;

    /// Take one received byte, or `None` when nothing is buffered
    ///
    /// Must never block.
    fn read_byte(&mut self) -> Option<u8>;

    /// Send all of `data`
    fn send(&mut self, data: &[u8]);
}

//! Timeouts and retry delays

/// Seconds without configuration input before an open update is closed
pub const CONFIG_TIMEOUT: u64 = 60;

/// Seconds to wait for a network, socket or server response
pub const CONNECTING_TIMEOUT: u64 = 10;

/// Seconds to wait before retrying after a failed connection stage
pub const CONNECTION_FAILED_DELAY: u64 = 5;

/// Timing configuration shared by the parser and the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Idle time that closes a configuration update
    pub config_timeout: u64,
    /// Time allowed for each connecting stage
    pub connecting_timeout: u64,
    /// Backoff after a failure
    pub failed_delay: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            config_timeout: CONFIG_TIMEOUT,
            connecting_timeout: CONNECTING_TIMEOUT,
            failed_delay: CONNECTION_FAILED_DELAY,
        }
    }
}

//! Telemetry from the speed control and the offset button

use super::calibration::Calibration;
use crate::connection::send_message;
use crate::log::logf;
use rand_core::RngCore;
use verbaleyes_hal::{LogSink, Socket};
use verbaleyes_protocol::{CoreMessage, Hundredths};

#[cfg(feature = "defmt")]
use defmt::{trace, warn};

// Stub macros when defmt is not available
#[cfg(not(feature = "defmt"))]
macro_rules! trace {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "defmt"))]
macro_rules! warn {
    ($($arg:tt)*) => {{}};
}

/// Turns raw samples into speed updates
///
/// Values inside the deadzone become exactly zero. A new value is only sent
/// when it moved further than the jitter size from the last one sent,
/// except that reaching zero is always sent once.
#[derive(Debug, Clone, Default)]
pub struct SpeedMapper {
    /// Last speed sent, in hundredths
    last: i32,
}

impl SpeedMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last speed sent to the server
    pub fn last(&self) -> Hundredths {
        Hundredths(self.last)
    }

    /// Map `raw` and send the speed if it changed enough
    ///
    /// Returns the speed that was sent.
    pub fn update<H>(&mut self, host: &mut H, calibration: &Calibration, raw: u16) -> Option<Hundredths>
    where
        H: Socket + LogSink + RngCore + ?Sized,
    {
        let mut mapped = calibration.map(raw);
        if mapped > calibration.deadzone_size {
            mapped -= calibration.deadzone_size;
        } else if mapped >= 0 {
            if self.last == 0 {
                return None;
            }
            mapped = 0;
        }

        if mapped != 0 && (mapped - i64::from(self.last)).abs() <= calibration.jitter_size {
            trace!("speed change within jitter");
            return None;
        }

        let speed = Hundredths(mapped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32);
        if let Err(_error) = send_message(host, &CoreMessage::Speed(speed)) {
            warn!("speed update not sent: {}", _error);
            return None;
        }
        logf!(host, "\r\nSpeed has been updated to: {}", speed);
        self.last = speed.0;
        Some(speed)
    }
}

/// Edge detector for the offset button
#[derive(Debug, Clone)]
pub struct OffsetButton {
    last_pressed: bool,
}

impl Default for OffsetButton {
    fn default() -> Self {
        // Held at power-on must not count as a press
        Self { last_pressed: true }
    }
}

impl OffsetButton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the button level; sends an offset reset on each new press
    pub fn update<H>(&mut self, host: &mut H, pressed: bool) -> bool
    where
        H: Socket + LogSink + RngCore + ?Sized,
    {
        let was_pressed = core::mem::replace(&mut self.last_pressed, pressed);
        if !pressed || was_pressed {
            return false;
        }
        if let Err(_error) = send_message(host, &CoreMessage::Offset) {
            warn!("offset reset not sent: {}", _error);
            return false;
        }
        host.log("\r\nScroll position has been set to: 0");
        true
    }
}

//! Calibration from stored settings
//!
//! Speeds are computed in hundredths. The configured speed range is widened
//! by the deadzone so the output stays continuous once the deadzone width
//! is subtracted again by the mapper.

use crate::config::{read_signed, read_unsigned, FieldId};
use crate::log::logf;
use verbaleyes_hal::{ConfigStorage, LogSink};

/// Highest deadzone percentage; 100 % would make the range infinite
pub const MAX_DEADZONE: u16 = 99;

/// Settings the calibration is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationSettings {
    pub speed_min: i16,
    pub speed_max: i16,
    /// Percent of the output range forced to zero
    pub deadzone: u16,
    /// Raw sample at minimum speed
    pub cal_low: u16,
    /// Raw sample at maximum speed
    pub cal_high: u16,
    /// Percent change needed before a new speed is sent
    pub sensitivity: u16,
}

impl CalibrationSettings {
    pub fn read<S: ConfigStorage + ?Sized>(storage: &mut S) -> Self {
        Self {
            speed_min: read_signed(storage, FieldId::SpeedMin),
            speed_max: read_signed(storage, FieldId::SpeedMax),
            deadzone: read_unsigned(storage, FieldId::Deadzone),
            cal_low: read_unsigned(storage, FieldId::CalLow),
            cal_high: read_unsigned(storage, FieldId::CalHigh),
            sensitivity: read_unsigned(storage, FieldId::Sensitivity),
        }
    }

    /// Print the settings in use
    pub fn log<L: LogSink + ?Sized>(&self, sink: &mut L) {
        logf!(
            sink,
            "\r\nSetting up speed reader with:\
             \r\n\tMaximum speed at: {}\
             \r\n\tMinimum speed at: {}\
             \r\n\tDeadzone at: {}%\
             \r\n\tCalibration low at: {}\
             \r\n\tCalibration high at: {}\
             \r\n\tSensitivity at: {}%\r\n",
            self.speed_max,
            self.speed_min,
            self.deadzone,
            self.cal_low,
            self.cal_high,
            self.sensitivity
        );
    }
}

/// Coefficients mapping a raw sample to a speed in hundredths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Output range including the deadzone, signed like `speed_max - speed_min`
    pub speed_range_size: i64,
    /// Hundredths per raw step
    pub mapper: f32,
    /// Output at raw sample zero
    pub offset: f32,
    pub deadzone_size: i64,
    /// Smallest change worth sending
    pub jitter_size: i64,
}

impl Calibration {
    pub fn derive(settings: &CalibrationSettings) -> Self {
        let deadzone = i64::from(settings.deadzone.min(MAX_DEADZONE));
        let range = (i64::from(settings.speed_max) - i64::from(settings.speed_min)) * 100;
        let deadzone_size = range.abs() * deadzone / (100 - deadzone);
        let speed_range_size = if range < 0 {
            range - deadzone_size
        } else {
            range + deadzone_size
        };

        let span = match i64::from(settings.cal_high) - i64::from(settings.cal_low) {
            0 => 1,
            span => span,
        };
        let mapper = speed_range_size as f32 / span as f32;
        let offset = (i64::from(settings.speed_min) * 100) as f32 - f32::from(settings.cal_low) * mapper;

        Self {
            speed_range_size,
            mapper,
            offset,
            deadzone_size,
            jitter_size: speed_range_size.abs() * i64::from(settings.sensitivity) / 100,
        }
    }

    /// Linear mapping of a raw sample, before deadzone handling
    pub fn map(&self, raw: u16) -> i64 {
        (f32::from(raw) * self.mapper + self.offset) as i64
    }
}

//! Speed mapping and telemetry
//!
//! Once connected, every raw sample of the speed control is mapped through
//! the [`Calibration`] derived on connect and reported by [`SpeedMapper`].

pub mod calibration;
pub mod mapper;

pub use calibration::{Calibration, CalibrationSettings, MAX_DEADZONE};
pub use mapper::{OffsetButton, SpeedMapper};

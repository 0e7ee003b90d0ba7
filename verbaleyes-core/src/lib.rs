//! Board-agnostic controller logic for the VerbalEyes scroll speed controller
//!
//! This crate contains everything that does not depend on a specific board:
//!
//! - Persisted configuration layout and the streaming key/value parser
//! - Connection state machine (network, socket, WebSocket upgrade, auth)
//! - Speed calibration, deadzone and jitter handling
//! - [`Controller`], one iteration of the device main loop
//!
//! All I/O goes through the collaborator traits of `verbaleyes-hal`; nothing
//! here blocks or allocates.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod log;

pub mod config;
pub mod connection;
pub mod controller;
pub mod parser;
pub mod speed;
pub mod timing;

#[cfg(test)]
mod mock;

pub use connection::{ConnectionStateMachine, Progress, Rewind, Stage};
pub use controller::{Controller, Status};
pub use parser::ConfigParser;
pub use timing::Timing;

//! VerbalEyes Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits that a board (or the host
//! emulator) implements so the controller logic can run unchanged on any
//! platform.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  verbaleyes-core (parser, link, speed)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  verbaleyes-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board glue   │       │   verbaleyes- │
//! │  (EEPROM, Wi) │       │    emulator   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`storage::ConfigStorage`] - Persisted configuration bytes
//! - [`net::Network`] - Wireless network association
//! - [`net::Socket`] - Non-blocking stream socket
//! - [`log::LogSink`] - Append-only diagnostic text
//! - [`clock::Clock`] - Monotonic seconds
//!
//! Random bytes for WebSocket keys and masks come from any
//! [`rand_core::RngCore`] implementation.

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod log;
pub mod net;
pub mod storage;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use log::LogSink;
pub use net::{LinkStatus, Network, Socket};
pub use rand_core::RngCore;
pub use storage::{ConfigStorage, StorageError};

/// Everything the controller needs from its environment
///
/// Implemented automatically for any type providing all collaborator
/// traits, so a board can hand the controller a single object.
pub trait Host: ConfigStorage + Network + Socket + LogSink + Clock + RngCore {}

// Blanket implementation
impl<T: ConfigStorage + Network + Socket + LogSink + Clock + RngCore> Host for T {}

//! VerbalEyes emulator
//!
//! Runs the controller logic on a desktop. Configuration is typed on stdin
//! exactly as on the board's serial console; the up and down arrow keys move
//! the emulated speed control and the right arrow key presses the offset
//! button. Device output goes to stdout, emulator diagnostics to stderr.

mod host;
mod input;

use anyhow::Context;
use clap::Parser;
use host::{EmulatedHost, FileStorage};
use input::{spawn_stdin_reader, Key};
use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verbaleyes_core::{Controller, Timing};

#[derive(Parser, Debug)]
#[command(name = "verbaleyes-emulator")]
#[command(about = "Run the VerbalEyes speed controller against a real server", long_about = None)]
struct Args {
    /// Storage file, created with defaults if missing
    #[arg(long, value_name = "PATH", default_value = "verbaleyes.cfg")]
    config: PathBuf,

    /// Highest raw value of the emulated speed control
    #[arg(long, default_value_t = 1023)]
    pot_max: u16,

    /// Change per arrow key press
    #[arg(long, default_value_t = 32)]
    pot_step: u16,

    /// Delay between loop iterations without input
    #[arg(long, value_name = "MS", default_value_t = 40)]
    sample_interval_ms: u64,

    /// Seed for WebSocket keys and masks; random if omitted
    #[arg(long)]
    seed: Option<u64>,
}

/// Emulated speed control and button
#[derive(Debug)]
struct Controls {
    pot: u16,
    pot_max: u16,
    pot_step: u16,
    /// Set for one iteration per button key press
    button: bool,
}

impl Controls {
    /// Apply a key; returns the configuration character it carries
    fn apply(&mut self, key: Key) -> Option<u8> {
        match key {
            Key::Config(byte) => return Some(byte),
            Key::PotUp => self.pot = self.pot.saturating_add(self.pot_step).min(self.pot_max),
            Key::PotDown => self.pot = self.pot.saturating_sub(self.pot_step),
            Key::OffsetButton => self.button = true,
        }
        tracing::debug!(pot = self.pot, button = self.button, "controls changed");
        None
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.pot_step > 0, "--pot-step must be at least 1");

    let storage = FileStorage::open(&args.config)
        .with_context(|| format!("opening storage {}", args.config.display()))?;
    let mut host = EmulatedHost::new(storage, args.seed);
    let mut controller = Controller::new(Timing::default());
    let mut controls = Controls {
        pot: 0,
        pot_max: args.pot_max,
        pot_step: args.pot_step,
        button: false,
    };

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx);
    tracing::info!(config = %args.config.display(), "emulator started");

    let interval = Duration::from_millis(args.sample_interval_ms);
    let mut input_open = true;
    let mut last_status = None;

    loop {
        let input = match rx.try_recv() {
            Ok(key) => controls.apply(key),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if input_open {
                    tracing::info!("input closed, continuing without it");
                    input_open = false;
                }
                None
            }
        };

        let status = controller.poll(&mut host, input, controls.pot, controls.button);
        controls.button = false;

        if last_status != Some(status) {
            tracing::debug!(?status, stage = ?controller.connection().stage(), "status changed");
            last_status = Some(status);
        }

        // Keep up with typing; otherwise sample at the configured rate
        if input.is_none() {
            thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controls_stay_in_range() {
        let mut controls = Controls {
            pot: 0,
            pot_max: 100,
            pot_step: 60,
            button: false,
        };

        assert_eq!(controls.apply(Key::PotDown), None);
        assert_eq!(controls.pot, 0);
        controls.apply(Key::PotUp);
        controls.apply(Key::PotUp);
        assert_eq!(controls.pot, 100);

        controls.apply(Key::OffsetButton);
        assert!(controls.button);
        assert_eq!(controls.apply(Key::Config(b'x')), Some(b'x'));
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::parse_from(["verbaleyes-emulator"]);
        assert_eq!(args.config, PathBuf::from("verbaleyes.cfg"));
        assert_eq!(args.pot_max, 1023);
        assert_eq!(args.seed, None);
    }
}

//! Diagnostic text output
//!
//! The text written here is what a user sees on the serial console while
//! configuring the device, so its content is part of the device's behavior.

/// Append-only sink for diagnostic text
pub trait LogSink {
    /// Append `text` to the log
    fn log(&mut self, text: &str);
}

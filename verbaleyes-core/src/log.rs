//! Formatting into a [`LogSink`]
//!
//! Formatted text is forwarded piece by piece, so messages of any length
//! reach the sink without an intermediate buffer.

use core::fmt;
use verbaleyes_hal::LogSink;

/// `fmt::Write` adapter over a log sink
pub(crate) struct SinkWriter<'a, L: LogSink + ?Sized>(pub(crate) &'a mut L);

impl<L: LogSink + ?Sized> fmt::Write for SinkWriter<'_, L> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.log(s);
        Ok(())
    }
}

/// Write formatted text to a log sink
macro_rules! logf {
    ($sink:expr, $($arg:tt)*) => {{
        use core::fmt::Write as _;
        // SinkWriter never fails
        let _ = write!($crate::log::SinkWriter(&mut *$sink), $($arg)*);
    }};
}

pub(crate) use logf;

/// Echo a received or typed byte
pub(crate) fn echo<L: LogSink + ?Sized>(sink: &mut L, byte: u8) {
    let mut buf = [0u8; 4];
    sink.log(char::from(byte).encode_utf8(&mut buf));
}

/// Echo a byte of a server response, indenting continuation lines
pub(crate) fn echo_response<L: LogSink + ?Sized>(sink: &mut L, byte: u8) {
    if byte == b'\n' {
        sink.log("\r\n\t");
    } else {
        echo(sink, byte);
    }
}

//! Time source

/// Monotonic clock with one second resolution
pub trait Clock {
    /// Seconds elapsed since an arbitrary fixed point (typically boot)
    fn now_secs(&self) -> u64;
}

//! # Process liveness probe.
//!
//! [`LogWatcher::seek_wait`](crate::LogWatcher::seek_wait) consults a probe
//! before every read: once the process is gone no further line can ever
//! satisfy the wait, so the wait fails immediately instead of running into its
//! deadline.

/// Reports whether a watched process has exited.
///
/// Implemented for [`std::process::Child`] and [`tokio::process::Child`];
/// an error from `try_wait` counts as exited.
pub trait Liveness: Send {
    /// Returns `true` once the process has exited.
    fn has_exited(&mut self) -> bool;
}

impl Liveness for std::process::Child {
    fn has_exited(&mut self) -> bool {
        !matches!(self.try_wait(), Ok(None))
    }
}

impl Liveness for tokio::process::Child {
    fn has_exited(&mut self) -> bool {
        !matches!(self.try_wait(), Ok(None))
    }
}

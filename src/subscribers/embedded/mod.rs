//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders events through `tracing`.
//! - [`StatusFile`]: appends the harness status lines to a file, which log
//!   assertions tail with [`LogWatcher`](crate::LogWatcher).
//!
//! Both share the canonical line format of [`status_line`].

mod log;
mod status_file;

pub use log::LogWriter;
pub use status_file::{StatusFile, status_line};

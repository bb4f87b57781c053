//! Log tailing and log-based synchronization.
//!
//! - [`LogWatcher`] tails one file: mark an origin, scan once for a literal,
//!   or poll for a regular expression under a deadline while watching a process.
//! - [`Liveness`] is the process check consulted while waiting.
//! - [`await_ready`] turns "pattern never appeared" into a [`StartError`](crate::StartError)
//!   for server start sequences.
//!
//! ```text
//!   positioning() ──► origin = EOF
//!
//!   seek_wait(p, StartAt::LastMatch) ──► scan from cursor ──► match ──► cursor = line_start + end
//!   seek_wait(p, StartAt::Origin)    ──► scan from origin ──► match (cursor untouched)
//! ```

mod liveness;
mod startup;
mod watcher;

pub use liveness::Liveness;
pub use startup::await_ready;
pub use watcher::{LogWatcher, SeekOptions, StartAt};

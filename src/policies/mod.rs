//! Polling policies.
//!
//! Tailing a file written by another process is done by polling: read until EOF,
//! sleep, read again. [`BackoffPolicy`] decides how long each sleep lasts.
//!
//! ## Quick wiring
//! ```text
//! Config { poll: BackoffPolicy, .. }
//!      └─► LogWatcher::with_config(path, &cfg) / WorkerContext::log_watcher(path)
//!           └─► LogWatcher::seek_wait uses:
//!                - poll.next(idle_polls) after every empty read
//!                - idle_polls = 0 as soon as a line arrives
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=1ms, factor=2.0, max=50ms.

mod backoff;

pub use backoff::BackoffPolicy;

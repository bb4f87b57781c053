//! # Event subscribers for the testvisor runtime.
//!
//! ```text
//!   Worker ── publish(Event) ──► Bus ──► Supervisor listener ──► SubscriberSet
//!                                                                    │
//!                                                     ┌──────────────┼──────────────┐
//!                                                     ▼              ▼              ▼
//!                                                 LogWriter      StatusFile       Custom
//! ```
//!
//! Results themselves are aggregated by the supervisor into a
//! [`RunReport`](crate::RunReport); subscribers are for live output.
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use testvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FailureCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TaskFailed {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//! }
//! ```

mod embedded;
mod set;
mod subscribe;

pub(crate) use set::panic_message;

pub use embedded::{LogWriter, StatusFile, status_line};
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

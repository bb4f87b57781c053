//! Runtime core: scheduling and lifecycle.
//!
//! Public API: [`Supervisor`] (pool driver), [`Worker`], [`TaskQueue`],
//! [`Basket`] / [`baskets`], [`Config`] and the report types.
//!
//! Internal modules:
//! - [`runner`]: executes one test with timeout, watchdog and event publishing;
//! - [`supervisor`]: per-suite queues and worker pools, shutdown with grace;
//! - [`worker`]: one server, sequential task loop, guaranteed server release;
//! - [`queue`]: FIFO with ack/join completion tracking;
//! - [`alive`]: tracks workers still holding a server (stuck detection);
//! - [`shutdown`]: signal and cancel triggers.

mod alive;
mod basket;
mod config;
mod queue;
mod report;
mod runner;
mod shutdown;
mod supervisor;
mod worker;

pub use basket::{Basket, baskets};
pub use config::Config;
pub use queue::{QueueItem, TaskQueue};
pub use report::{RunReport, SuiteReport, TaskOutcome, TaskRecord, WorkerReport};
pub use supervisor::Supervisor;
pub use worker::Worker;

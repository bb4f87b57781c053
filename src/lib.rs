//! # testvisor
//!
//! **Testvisor** runs the test suites of a database server in parallel.
//!
//! Every suite gets a pool of workers; each worker owns one dedicated server
//! instance and pulls test ids from a queue shared with its peers. Server
//! readiness, crashes and hangs are detected by tailing server log files for
//! expected lines under deadlines.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Basket "box" │   │ Basket "sql" │   │ Basket "repl"│
//!     │ (suite+ids)  │   │ (suite+ids)  │   │ (suite+ids)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (pool driver, one suite at a time)                    │
//! │  - TaskQueue per suite (ids in discovery order + N × Stop)        │
//! │  - Bus (broadcast events)                                         │
//! │  - AliveTracker (workers still holding a server)                  │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ Worker 01_box│   │ Worker 02_box│   │ Worker NN_box│   │
//!     │ own server   │   │ own server   │   │ own server   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ TaskStarting     │ TaskPassed       │ NoOutput        │
//!      │ TaskFailed       │ WorkerStopped    │ TimeoutHit      │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───┬────────────────┬───┘
//!                           ▼                ▼
//!                    AliveTracker     SubscriberSet
//!                                  ┌─────────┼─────────┐
//!                                  ▼         ▼         ▼
//!                              LogWriter StatusFile  custom
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! gen_server ─► start_server ─┬─ Err ─► stop_server(server, None), no tasks consumed
//!                             └─ Ok  ─► loop {
//!                                         pop ─► Stop     ─► ack, exit
//!                                             ─► Task(id) ─► run_test (isolated) ─► ack
//!                                       }
//!                                       stop_server(server, Some(inspector))
//! ```
//!
//! ### Log synchronization
//! ```text
//! LogWatcher::positioning()            remember where the log ends now
//! ... start server / trigger action ...
//! LogWatcher::seek_wait(pattern, opts) poll new lines until match, deadline or process death
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Suites**        | Server lifecycle and test execution contract.                | [`Suite`], [`ServerHandle`]                 |
//! | **Scheduling**    | Per-suite queues and worker pools, stress repetition.        | [`Supervisor`], [`Worker`], [`TaskQueue`]   |
//! | **Log tailing**   | Wait for log lines under deadlines, fail fast on crashes.    | [`LogWatcher`], [`SeekOptions`]             |
//! | **Subscriber API**| Live status output, custom hooks.                            | [`Subscribe`], [`LogWriter`], [`StatusFile`]|
//! | **Errors**        | Typed errors for startup, tests, queue and runtime.          | [`StartError`], [`TaskError`], [`RuntimeError`] |
//! | **Configuration** | Explicit settings passed by reference.                       | [`Config`], [`BackoffPolicy`]               |
//! | **Results**       | Per-task records aggregated per suite and per run.           | [`RunReport`], [`TaskOutcome`]              |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use testvisor::{Config, StatusFile, Subscribe, Suite, Supervisor, baskets};
//!
//! async fn run<S: Suite>(suites: Vec<Arc<S>>) -> Result<bool, Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         workers: 4,
//!         ..Config::default()
//!     };
//!     let status = Arc::new(StatusFile::open("var/status.log").await?);
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![status];
//!
//!     let report = Supervisor::new(cfg, subs).run(baskets(suites)).await?;
//!     Ok(report.is_success())
//! }
//! ```

mod core;
mod error;
mod events;
mod log;
mod policies;
mod subscribers;
mod suite;

// ---- Public re-exports ----

pub use crate::core::{
    Basket, Config, QueueItem, RunReport, SuiteReport, Supervisor, TaskOutcome, TaskQueue,
    TaskRecord, Worker, WorkerReport, baskets,
};
pub use error::{HarnessError, LogError, QueueError, RuntimeError, StartError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use log::{Liveness, LogWatcher, SeekOptions, StartAt, await_ready};
pub use policies::BackoffPolicy;
pub use subscribers::{LogWriter, StatusFile, Subscribe, SubscriberSet, status_line};
pub use suite::{ServerHandle, Suite, TaskDescriptor, WorkerContext};

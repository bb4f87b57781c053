//! # Suite contract.
//!
//! A [`Suite`] is a server factory plus a test executor. Every
//! [`Worker`](crate::Worker) asks the suite for its own server, starts it,
//! runs tests against it and finally hands it back:
//!
//! ```text
//! gen_server(ctx) ──► start_server(&mut server, ctx, token) ──► inspector
//!                                 │
//!        ┌────────────────────────┘
//!        ▼
//! run_test(task, &mut server, &mut inspector, token)   (0..n times)
//!        │
//!        ▼
//! stop_server(server, Some(inspector))                 (exactly once)
//! ```
//!
//! If `start_server` fails, or the worker is cancelled or dropped while it is
//! still starting, the server is released with `stop_server(server, None)` and
//! no tasks are consumed.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{StartError, TaskError};
use crate::log::Liveness;
use crate::suite::{TaskDescriptor, WorkerContext};

/// A server instance owned by one worker.
///
/// The liveness probe lets log waits fail fast when the process dies.
pub trait ServerHandle: Liveness + Send + 'static {
    /// Instance name, as rendered in [`StartError`].
    fn name(&self) -> &str;

    /// Log file of the instance, tailed with [`LogWatcher`](crate::LogWatcher).
    fn log_path(&self) -> &Path;
}

/// Test suite: ordered tasks plus the server lifecycle they need.
#[async_trait]
pub trait Suite: Send + Sync + 'static {
    /// Server type handed to each worker.
    type Server: ServerHandle;

    /// Per-server companion produced by a successful start (admin connection,
    /// log watcher, ...). Dropped through [`Suite::stop_server`].
    type Inspector: Send + 'static;

    /// Suite path, e.g. `"box"` or `"replication/sync"`.
    fn path(&self) -> &str;

    /// Tasks in discovery order. Names must be unique within the suite.
    fn tasks(&self) -> &[TaskDescriptor];

    /// Creates (but does not start) a fresh server for the worker in `ctx`.
    fn gen_server(&self, ctx: &WorkerContext) -> Result<Self::Server, StartError>;

    /// Starts `server` and returns its inspector once it is ready.
    ///
    /// `token` is cancelled when the run shuts down; a start that is still
    /// waiting for readiness should give up with a [`StartError`] then.
    async fn start_server(
        &self,
        server: &mut Self::Server,
        ctx: &WorkerContext,
        token: CancellationToken,
    ) -> Result<Self::Inspector, StartError>;

    /// Runs one test against the worker's server.
    ///
    /// `token` is cancelled when the task exceeds a deadline or the run is
    /// shutting down; long tests should return [`TaskError::Canceled`] then.
    async fn run_test(
        &self,
        task: &TaskDescriptor,
        server: &mut Self::Server,
        inspector: &mut Self::Inspector,
        token: CancellationToken,
    ) -> Result<(), TaskError>;

    /// Stops and releases `server`. `inspector` is `None` when the start failed.
    async fn stop_server(&self, server: Self::Server, inspector: Option<Self::Inspector>);
}

//! # Worker: one suite, one server, a stream of task ids.
//!
//! A [`Worker`] owns exactly one started server (plus its inspector) for its
//! whole lifetime and pulls task ids from the suite's shared [`TaskQueue`].
//!
//! ## Architecture
//! ```text
//! Worker::start(suite, ctx, bus, token)
//!   ├─► publish WorkerStarting
//!   ├─► suite.gen_server(ctx)                     (server now held by the lease)
//!   ├─► suite.start_server(&mut server, ctx, token)
//!   │      └─ Err → suite.stop_server(server, None); publish WorkerStartFailed
//!   └─► publish WorkerReady
//!
//! Worker::run_all(queue, token)
//! loop {
//!   ├─► pop() (or token cancelled → break)
//!   ├─► Stop         → ack, break
//!   ├─► Task(id)     → run_task(id) → ack
//!   └─► unknown id   → publish WorkerHalted, ack, break
//! }
//! shutdown() → suite.stop_server(server, Some(inspector)) → publish WorkerStopped
//! ```
//!
//! ## Rules
//! - Tasks of one worker run sequentially, in pop order.
//! - A failing or panicking test never ends the loop.
//! - `stop_server` runs exactly once per generated server: explicitly after a
//!   failed start or at the end of [`Worker::run_all`], or from the drop guard
//!   when the worker future is dropped first (including mid-start).

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::runner::{Scope, run_once};
use crate::core::{QueueItem, TaskQueue, TaskRecord, WorkerReport};
use crate::error::{HarnessError, StartError};
use crate::events::{Bus, EventKind};
use crate::suite::{ServerHandle, Suite, WorkerContext};

/// Server (and, once started, its inspector) held by a worker; released on
/// drop if still held.
struct Lease<S: Suite> {
    suite: Arc<S>,
    server: Option<S::Server>,
    inspector: Option<S::Inspector>,
}

impl<S: Suite> Lease<S> {
    fn new(suite: Arc<S>) -> Self {
        Self {
            suite,
            server: None,
            inspector: None,
        }
    }

    /// Stops the server now, if still held.
    async fn release(&mut self) {
        if let Some(server) = self.server.take() {
            let inspector = self.inspector.take();
            self.suite.stop_server(server, inspector).await;
        }
    }
}

impl<S: Suite> Drop for Lease<S> {
    fn drop(&mut self) {
        let Some(server) = self.server.take() else {
            return;
        };
        let inspector = self.inspector.take();
        let name = server.name().to_string();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(server = %name, "worker dropped early; stopping server in background");
                let suite = Arc::clone(&self.suite);
                handle.spawn(async move {
                    suite.stop_server(server, inspector).await;
                });
            }
            Err(_) => {
                tracing::error!(server = %name, "worker dropped outside a runtime; server not stopped");
            }
        }
    }
}

/// Test executor bound to one suite and one server.
pub struct Worker<S: Suite> {
    ctx: WorkerContext,
    scope: Scope,
    index: HashMap<String, usize>,
    lease: Lease<S>,
}

impl<S: Suite> Worker<S> {
    /// Creates the worker's server and starts it.
    ///
    /// On failure the partially created server is released through
    /// [`Suite::stop_server`] (with no inspector) before the error is returned,
    /// and the worker consumes no tasks. `token` reaches
    /// [`Suite::start_server`]; if this future is dropped mid-start the server
    /// is released in the background.
    pub async fn start(
        suite: Arc<S>,
        ctx: WorkerContext,
        bus: Bus,
        token: CancellationToken,
    ) -> Result<Self, StartError> {
        let scope = Scope {
            suite: Arc::from(suite.path()),
            worker: Arc::from(ctx.name()),
            bus,
        };
        scope.publish(scope.event(EventKind::WorkerStarting));

        let mut lease = Lease::new(Arc::clone(&suite));
        match Self::launch(&suite, &ctx, token, &mut lease).await {
            Ok(name) => tracing::debug!(worker = ctx.name(), server = %name, "server ready"),
            Err(e) => {
                lease.release().await;
                tracing::error!(worker = ctx.name(), error = %e, "server failed to start");
                scope.publish(
                    scope
                        .event(EventKind::WorkerStartFailed)
                        .with_reason(e.to_string()),
                );
                return Err(e);
            }
        }
        scope.publish(scope.event(EventKind::WorkerReady));

        let index = suite
            .tasks()
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();

        Ok(Self {
            ctx,
            scope,
            index,
            lease,
        })
    }

    /// Generates the server straight into `lease`, then starts it.
    async fn launch(
        suite: &S,
        ctx: &WorkerContext,
        token: CancellationToken,
        lease: &mut Lease<S>,
    ) -> Result<String, StartError> {
        let server = lease.server.insert(suite.gen_server(ctx)?);
        lease.inspector = Some(suite.start_server(server, ctx, token).await?);
        Ok(server.name().to_string())
    }

    /// Worker name (`NN_suite`).
    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// Worker context handed to the suite.
    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Consumes `queue` until a stop item, a harness error or `token` cancellation,
    /// then releases the server.
    pub async fn run_all(mut self, queue: Arc<TaskQueue>, token: CancellationToken) -> WorkerReport {
        let mut report = WorkerReport {
            worker: self.name().to_string(),
            ..WorkerReport::default()
        };

        loop {
            let item = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                item = queue.pop() => item,
            };

            let (stop, res) = match item {
                Ok(QueueItem::Stop) => (true, queue.ack().map_err(HarnessError::from)),
                Ok(QueueItem::Task(id)) => {
                    let run = self.run_task(&id, &token).await;
                    let acked = queue.ack();
                    let res = match run {
                        Ok(record) => {
                            report.records.push(record);
                            acked.map_err(HarnessError::from)
                        }
                        Err(e) => Err(e),
                    };
                    (false, res)
                }
                Err(e) => (true, Err(HarnessError::from(e))),
            };

            if let Err(e) = res {
                tracing::error!(worker = self.name(), error = %e, label = e.as_label(), "worker halted");
                self.scope.publish(
                    self.scope
                        .event(EventKind::WorkerHalted)
                        .with_reason(e.to_string()),
                );
                report.halted = Some(e.to_string());
                break;
            }
            if stop {
                break;
            }
        }

        self.shutdown(report.records.len()).await;
        report
    }

    /// Resolves `id` and runs it on this worker's server.
    ///
    /// A failing test is a [`TaskRecord`] with a failed outcome; only harness
    /// invariant violations are errors.
    pub async fn run_task(
        &mut self,
        id: &str,
        token: &CancellationToken,
    ) -> Result<TaskRecord, HarnessError> {
        let suite = Arc::clone(&self.lease.suite);
        let Some(task) = self.index.get(id).and_then(|&i| suite.tasks().get(i)) else {
            return Err(HarnessError::UnknownTask {
                suite: suite.path().to_string(),
                task: id.to_string(),
            });
        };
        let (Some(server), Some(inspector)) =
            (self.lease.server.as_mut(), self.lease.inspector.as_mut())
        else {
            return Err(HarnessError::ServerReleased {
                worker: self.ctx.name().to_string(),
            });
        };

        self.scope
            .publish(self.scope.event(EventKind::TaskStarting).with_task(id));
        let (outcome, elapsed) = run_once(
            suite.as_ref(),
            task,
            server,
            inspector,
            token,
            self.ctx.config(),
            &self.scope,
        )
        .await;

        Ok(TaskRecord {
            task: id.to_string(),
            worker: self.ctx.name().to_string(),
            outcome,
            elapsed,
        })
    }

    /// Stops the server and publishes `WorkerStopped`.
    async fn shutdown(mut self, executed: usize) {
        self.lease.release().await;
        self.scope.publish(
            self.scope
                .event(EventKind::WorkerStopped)
                .with_count(executed),
        );
    }
}

//! # Supervisor: drives worker pools over suite queues, fan-out delivery, and graceful shutdown.
//!
//! The [`Supervisor`] owns the event bus, the subscribers and the run
//! configuration. For every [`Basket`] it seeds one [`TaskQueue`], spawns
//! `cfg.workers` workers over it and waits until the queue is drained.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<Basket<S>>  ──►  Supervisor::run(baskets)
//!
//! Preparation:
//!   - subscriber_listener(): Bus.subscribe() ─► AliveTracker::update + SubscriberSet::emit
//!
//! Per basket (sequentially):
//!   feeder:  push ids (discovery order) ─► [join ─► push ids]* ─► push N × Stop
//!   workers: Worker 01 .. Worker N  (JoinSet)  each: start server ─► run_all(queue)
//!   after all workers returned:
//!     cancel feeder ─► drain_remaining() → skipped ─► queue.join()
//!
//! Shutdown path:
//!   termination signal | Supervisor::cancel()   (shutdown::requested)
//!             └─► Bus.publish(ShutdownRequested)
//!             └─► runtime_token.cancel()   → workers stop between tasks
//!             └─► wait up to cfg.grace for the run to unwind:
//!                    ├─ Ok         → Bus.publish(AllStoppedWithin) → RuntimeError::Interrupted{report}
//!                    └─ exceeded   → Bus.publish(GraceExceeded)    → RuntimeError::GraceExceeded{stuck}
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use testvisor::{Config, LogWriter, Subscribe, Supervisor, Suite, baskets};
//!
//! async fn run_all<S: Suite>(suites: Vec<Arc<S>>) -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         workers: 4,
//!         ..Config::default()
//!     };
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let report = Supervisor::new(cfg, subs).run(baskets(suites)).await?;
//!     println!("{} passed, {} failed", report.passed(), report.failed());
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::alive::AliveTracker;
use crate::core::{Basket, Config, QueueItem, RunReport, SuiteReport, TaskQueue, WorkerReport, shutdown};
use crate::error::{QueueError, RuntimeError, StartError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::suite::Suite;

enum WorkerExit {
    Finished(WorkerReport),
    StartFailed(String, StartError),
}

/// Coordinates worker pools, event delivery and graceful shutdown.
pub struct Supervisor {
    cfg: Arc<Config>,
    bus: Bus,
    subs: Vec<Arc<dyn Subscribe>>,
    alive: Arc<AliveTracker>,
    token: CancellationToken,
}

impl Supervisor {
    /// Creates a supervisor with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg: Arc::new(cfg),
            bus,
            subs: subscribers,
            alive: Arc::new(AliveTracker::new()),
            token: CancellationToken::new(),
        }
    }

    /// Event bus shared with all workers; subscribe here for raw events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Run configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Token that triggers the same graceful shutdown as a termination signal.
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests graceful shutdown.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Runs every basket to completion, one suite after another.
    ///
    /// Returns when either:
    /// - every queue drained → `Ok(report)`, or
    /// - shutdown was requested → `Err(Interrupted)` with the partial report,
    ///   or `Err(GraceExceeded)` when workers did not stop within `cfg.grace`.
    ///
    /// Subscribers have seen every event by the time this returns.
    pub async fn run<S: Suite>(self, baskets: Vec<Basket<S>>) -> Result<RunReport, RuntimeError> {
        let set = SubscriberSet::new(self.subs.clone(), self.bus.clone());
        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(set, listener_stop.clone());

        let res = {
            let drive = drive(
                Arc::clone(&self.cfg),
                self.bus.clone(),
                self.token.clone(),
                baskets,
            );
            tokio::pin!(drive);

            tokio::select! {
                report = &mut drive => Ok(report),
                _ = shutdown::requested(&self.token) => {
                    tracing::warn!(grace = ?self.cfg.grace, "shutdown requested");
                    self.bus.publish(Event::new(EventKind::ShutdownRequested));
                    self.token.cancel();
                    self.wait_all_with_grace(&mut drive).await
                }
            }
        };

        listener_stop.cancel();
        let _ = listener.await;
        res
    }

    /// Subscribes to the bus and forwards events to the tracker and the subscriber set.
    ///
    /// After `stop` the backlog is drained and subscribers are flushed.
    fn subscriber_listener(&self, set: SubscriberSet, stop: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let alive = Arc::clone(&self.alive);
        tokio::spawn(async move {
            use tokio::sync::broadcast::error::{RecvError, TryRecvError};
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => {
                            alive.update(&ev).await;
                            set.emit(&ev);
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        set.emit(&ev);
                    }
                    Err(TryRecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "event listener lagged");
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        })
    }

    /// Waits for the interrupted run to unwind within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the list of stuck workers.
    async fn wait_all_with_grace<F>(&self, drive: &mut Pin<&mut F>) -> Result<RunReport, RuntimeError>
    where
        F: Future<Output = RunReport>,
    {
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, drive.as_mut()).await {
            Ok(report) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Err(RuntimeError::Interrupted {
                    report: Box::new(report),
                })
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot().await;
                tracing::error!(?grace, ?stuck, "workers did not stop within grace");
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

async fn drive<S: Suite>(
    cfg: Arc<Config>,
    bus: Bus,
    token: CancellationToken,
    baskets: Vec<Basket<S>>,
) -> RunReport {
    let mut report = RunReport::default();
    for basket in baskets {
        if token.is_cancelled() {
            break;
        }
        report
            .suites
            .push(run_suite(&cfg, &bus, &token, basket).await);
    }
    report
}

/// Runs one basket: seeds its queue, drives `cfg.workers` workers over it and
/// waits until every pushed item is acknowledged.
async fn run_suite<S: Suite>(
    cfg: &Arc<Config>,
    bus: &Bus,
    token: &CancellationToken,
    basket: Basket<S>,
) -> SuiteReport {
    let started = Instant::now();
    let workers = cfg.worker_count();
    let queue = Arc::new(TaskQueue::new());
    let key = basket.key().to_string();
    let basket = Arc::new(basket);

    tracing::debug!(suite = %key, tasks = basket.tasks().len(), workers, "suite starting");
    bus.publish(
        Event::new(EventKind::SuiteStarting)
            .with_suite(key.as_str())
            .with_count(basket.tasks().len()),
    );

    let feeder_token = token.child_token();
    let feeder = tokio::spawn(feed(
        Arc::clone(&queue),
        basket.tasks().to_vec(),
        workers,
        cfg.repeat_limit(),
        feeder_token.clone(),
    ));

    let mut set = JoinSet::new();
    for id in 1..=workers {
        let basket = Arc::clone(&basket);
        let ctx = basket.context(id, Arc::clone(cfg));
        let queue = Arc::clone(&queue);
        let bus = bus.clone();
        let token = token.child_token();
        set.spawn(async move {
            let name = ctx.name().to_string();
            match basket.gen_worker(ctx, bus, token.clone()).await {
                Ok(worker) => WorkerExit::Finished(worker.run_all(queue, token).await),
                Err(e) => WorkerExit::StartFailed(name, e),
            }
        });
    }

    let mut report = SuiteReport::new(key.as_str());
    while let Some(res) = set.join_next().await {
        match res {
            Ok(WorkerExit::Finished(worker)) => report.absorb(worker),
            Ok(WorkerExit::StartFailed(name, e)) => report.start_failures.push((name, e)),
            Err(err) => tracing::error!(suite = %key, %err, "worker task aborted"),
        }
    }

    feeder_token.cancel();
    match feeder.await {
        Ok(Err(e)) => tracing::error!(suite = %key, error = %e, "feeder stopped"),
        Err(err) => tracing::error!(suite = %key, %err, "feeder task aborted"),
        Ok(Ok(())) => {}
    }
    report.skipped = queue.drain_remaining();
    if !report.skipped.is_empty() {
        tracing::warn!(suite = %key, skipped = report.skipped.len(), "tasks left unexecuted");
    }
    queue.join().await;

    report.elapsed = started.elapsed();
    bus.publish(
        Event::new(EventKind::SuiteFinished)
            .with_suite(key.as_str())
            .with_count(report.records.len())
            .with_elapsed(report.elapsed),
    );
    report
}

/// Pushes the suite's task ids round by round, then one stop item per worker.
///
/// - `rounds = Some(1)`: one round, stops pushed right after it
/// - `rounds = Some(n)`: each further round is pushed once the previous one drained
/// - `rounds = None`: rounds continue until `token` is cancelled; no stops are pushed
async fn feed(
    queue: Arc<TaskQueue>,
    tasks: Vec<String>,
    workers: usize,
    rounds: Option<usize>,
    token: CancellationToken,
) -> Result<(), QueueError> {
    let mut round = 0usize;
    loop {
        for id in &tasks {
            queue.push(QueueItem::Task(id.clone()))?;
        }
        round += 1;
        if rounds.is_some_and(|n| round >= n) {
            break;
        }
        tokio::select! {
            _ = queue.join() => {}
            _ = token.cancelled() => return Ok(()),
        }
        if token.is_cancelled() {
            return Ok(());
        }
        tracing::debug!(round, "round drained; feeding again");
    }
    for _ in 0..workers {
        queue.push(QueueItem::Stop)?;
    }
    Ok(())
}

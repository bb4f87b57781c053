//! # Runtime events emitted by the supervisor and workers.
//!
//! [`EventKind`] classifies events in four groups:
//! - **Suite events**: a suite's queue was seeded / fully drained
//! - **Worker events**: server start, start failure, halt, release
//! - **Task events**: start, pass, fail, timeout, no-output warnings
//! - **Runtime events**: shutdown handling and subscriber health
//!
//! [`Event`] carries the optional metadata (suite, worker, task, reason, timings).
//!
//! ## Ordering guarantees
//! Each event has a globally unique, monotonically increasing sequence number
//! (`seq`). Events published by one worker are observed in publish order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use testvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_worker("01_box")
//!     .with_task("hang.test.lua")
//!     .with_reason("timeout: 30s")
//!     .with_elapsed(Duration::from_secs(30));
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("hang.test.lua"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `worker` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `worker` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal or explicit cancel).
    ShutdownRequested,

    /// All workers released their servers within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,

    // === Suite events ===
    /// Queue seeded and workers spawned for a suite.
    ///
    /// Sets: `suite`, `count` (number of task ids per round).
    SuiteStarting,

    /// Every item pushed for the suite was acknowledged.
    ///
    /// Sets: `suite`, `count` (number of executed tasks), `elapsed`.
    SuiteFinished,

    // === Worker events ===
    /// Worker requested a server instance.
    ///
    /// Sets: `suite`, `worker`.
    WorkerStarting,

    /// Worker's server started; the worker now consumes the queue.
    ///
    /// Sets: `suite`, `worker`.
    WorkerReady,

    /// Worker's server failed to start; the worker consumes nothing.
    ///
    /// Sets: `suite`, `worker`, `reason` (rendered [`StartError`](crate::StartError)).
    WorkerStartFailed,

    /// Worker hit an invariant violation and left the pool.
    ///
    /// Sets: `suite`, `worker`, `reason`.
    WorkerHalted,

    /// Worker released its server.
    ///
    /// Sets: `suite`, `worker`, `count` (tasks executed).
    WorkerStopped,

    // === Task events ===
    /// Task execution is starting.
    ///
    /// Sets: `suite`, `worker`, `task`.
    TaskStarting,

    /// Task passed.
    ///
    /// Sets: `suite`, `worker`, `task`, `elapsed`.
    TaskPassed,

    /// Task failed (error, panic, timeout or no-output abort).
    ///
    /// Sets: `suite`, `worker`, `task`, `reason`, `elapsed`.
    TaskFailed,

    /// Task exceeded its configured timeout (always followed by `TaskFailed`).
    ///
    /// Sets: `suite`, `worker`, `task`, `timeout`.
    TimeoutHit,

    /// A running task has been silent for `elapsed`; it will be aborted once
    /// silence reaches `timeout`.
    ///
    /// Sets: `suite`, `worker`, `task`, `elapsed`, `timeout`.
    NoOutput,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Suite key, if applicable.
    pub suite: Option<Arc<str>>,
    /// Worker name (`NN_suite`), or subscriber name for subscriber events.
    pub worker: Option<Arc<str>>,
    /// Task id, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Elapsed time (task duration, silence length, suite duration).
    pub elapsed: Option<Duration>,
    /// Configured limit (task timeout, no-output abort window).
    pub timeout: Option<Duration>,
    /// Item count (tasks per round, tasks executed).
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            suite: None,
            worker: None,
            task: None,
            reason: None,
            elapsed: None,
            timeout: None,
            count: None,
        }
    }

    /// Attaches a suite key.
    #[inline]
    pub fn with_suite(mut self, suite: impl Into<Arc<str>>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an elapsed duration.
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed = Some(d);
        self
    }

    /// Attaches a configured limit.
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    /// Attaches an item count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for events that report a failure (task, worker start, halt, grace).
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskFailed
                | EventKind::WorkerStartFailed
                | EventKind::WorkerHalted
                | EventKind::GraceExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskStarting);
        let b = Event::new(EventKind::TaskPassed);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn failure_classification() {
        assert!(Event::new(EventKind::TaskFailed).is_failure());
        assert!(Event::new(EventKind::WorkerStartFailed).is_failure());
        assert!(!Event::new(EventKind::NoOutput).is_failure());
        assert!(!Event::new(EventKind::TaskPassed).is_failure());
    }
}

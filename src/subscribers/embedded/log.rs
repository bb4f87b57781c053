//! # LogWriter: events as tracing records
//!
//! Emits every event through `tracing`: status-bearing events use their
//! [`status_line`] text, lifecycle events a short bracketed tag.
//!
//! ## Example output
//! ```text
//! INFO  [suite-starting] suite="box" tasks=12
//! INFO  [worker-ready] worker="01_box"
//! INFO  [01_box] select.test.lua [ pass ]
//! WARN  [01_box] No output during 10 seconds. Will abort after 60 seconds
//! ERROR [01_box] hang.test.lua [ fail ]
//! INFO  [worker-stopped] worker="01_box" tasks=12
//! ```

use async_trait::async_trait;

use super::status_line;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        if let Some(line) = status_line(e) {
            match e.kind {
                EventKind::NoOutput => tracing::warn!("{line}"),
                _ if e.is_failure() => tracing::error!("{line}"),
                _ => tracing::info!("{line}"),
            }
            return;
        }

        match e.kind {
            EventKind::SuiteStarting => {
                tracing::info!(suite = ?e.suite, tasks = ?e.count, "[suite-starting]");
            }
            EventKind::SuiteFinished => {
                tracing::info!(suite = ?e.suite, tasks = ?e.count, elapsed = ?e.elapsed, "[suite-finished]");
            }
            EventKind::WorkerStarting => tracing::debug!(worker = ?e.worker, "[worker-starting]"),
            EventKind::WorkerReady => tracing::info!(worker = ?e.worker, "[worker-ready]"),
            EventKind::WorkerStopped => {
                tracing::info!(worker = ?e.worker, tasks = ?e.count, "[worker-stopped]");
            }
            EventKind::TaskStarting => {
                tracing::debug!(worker = ?e.worker, task = ?e.task, "[starting]");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(worker = ?e.worker, task = ?e.task, timeout = ?e.timeout, "[timeout]");
            }
            EventKind::ShutdownRequested => tracing::warn!("[shutdown-requested]"),
            EventKind::AllStoppedWithin => tracing::info!("[all-stopped-within-grace]"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = ?e.worker, reason = ?e.reason, "[subscriber-overflow]");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = ?e.worker, info = ?e.reason, "[subscriber-panicked]");
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

//! # Run a single test on a worker's server.
//!
//! Executes one [`Suite::run_test`] call with panic isolation, an optional hard
//! timeout and the no-output watchdog, and publishes lifecycle events to [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   run_test() → Ok(()) → publish TaskPassed
//!
//! Failure / panic:
//!   run_test() → Err(e) | panic → publish TaskFailed
//!
//! Silence:
//!   every warn period → publish NoOutput{elapsed, abort_after}
//!   silence ≥ no_output_timeout → cancel child → publish TaskFailed (no output)
//!
//! Timeout:
//!   task_timeout exceeded → cancel child → publish TimeoutHit
//!                                        → publish TaskFailed (timeout)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `TaskPassed` or `TaskFailed`
//! - `TimeoutHit` is published **in addition to** `TaskFailed` on timeout
//! - Derives a **child token** per task; cancelling it never affects the worker

use std::future::pending;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::{Config, TaskOutcome};
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;
use crate::suite::{Suite, TaskDescriptor};

/// Bus handle plus the labels attached to every event a worker publishes.
#[derive(Clone, Debug)]
pub(crate) struct Scope {
    pub suite: Arc<str>,
    pub worker: Arc<str>,
    pub bus: Bus,
}

impl Scope {
    pub(crate) fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_suite(Arc::clone(&self.suite))
            .with_worker(Arc::clone(&self.worker))
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }
}

/// Executes `task` once, publishing lifecycle events through `scope`.
///
/// ### Limits
/// - `cfg.task_timeout()`: hard limit, reported as [`TaskError::Timeout`]
/// - `cfg.no_output_timeout()`: silence limit, reported as [`TaskError::NoOutput`];
///   a `NoOutput` warning goes out every `cfg.no_output_warn_period` before that
///
/// On either limit the child token is cancelled and the test future dropped.
///
/// ### Cancellation semantics
/// The parent token propagates to the child handed to `run_test`; a test that
/// notices and returns [`TaskError::Canceled`] is reported as failed.
pub(crate) async fn run_once<S: Suite>(
    suite: &S,
    task: &TaskDescriptor,
    server: &mut S::Server,
    inspector: &mut S::Inspector,
    parent: &CancellationToken,
    cfg: &Config,
    scope: &Scope,
) -> (TaskOutcome, Duration) {
    let child = parent.child_token();
    let started = Instant::now();

    let exec = AssertUnwindSafe(suite.run_test(task, server, inspector, child.clone()))
        .catch_unwind()
        .map(|res| match res {
            Ok(r) => r,
            Err(payload) => Err(TaskError::Panicked {
                info: panic_message(&*payload),
            }),
        });

    let hard_limit = async {
        match cfg.task_timeout() {
            Some(dur) => {
                time::sleep(dur).await;
                dur
            }
            None => pending().await,
        }
    };
    let silence = watchdog(cfg, scope, task.name());

    let res = tokio::select! {
        res = exec => res,
        dur = hard_limit => {
            child.cancel();
            scope.publish(
                scope
                    .event(EventKind::TimeoutHit)
                    .with_task(task.name())
                    .with_timeout(dur),
            );
            Err(TaskError::Timeout { timeout: dur })
        }
        after = silence => {
            child.cancel();
            Err(TaskError::NoOutput { after })
        }
    };
    let elapsed = started.elapsed();

    match res {
        Ok(()) => {
            scope.publish(
                scope
                    .event(EventKind::TaskPassed)
                    .with_task(task.name())
                    .with_elapsed(elapsed),
            );
            (TaskOutcome::Passed, elapsed)
        }
        Err(e) => {
            tracing::warn!(
                worker = %scope.worker,
                task = task.name(),
                error = %e,
                label = e.as_label(),
                "test failed; worker continues"
            );
            let reason = e.reason();
            scope.publish(
                scope
                    .event(EventKind::TaskFailed)
                    .with_task(task.name())
                    .with_reason(reason.as_str())
                    .with_elapsed(elapsed),
            );
            (TaskOutcome::Failed(reason), elapsed)
        }
    }
}

/// Resolves once the task has been silent for the whole no-output window,
/// publishing a `NoOutput` warning every warn period before that.
///
/// Never resolves when the watchdog is disabled.
async fn watchdog(cfg: &Config, scope: &Scope, task: &str) -> Duration {
    let Some(abort_after) = cfg.no_output_timeout() else {
        return pending().await;
    };
    let period = if cfg.no_output_warn_period.is_zero() {
        abort_after
    } else {
        cfg.no_output_warn_period.min(abort_after)
    };

    let mut ticker = time::interval_at(Instant::now() + period, period);
    let mut silent = Duration::ZERO;
    loop {
        ticker.tick().await;
        silent += period;
        if silent >= abort_after {
            return abort_after;
        }
        scope.publish(
            scope
                .event(EventKind::NoOutput)
                .with_task(task)
                .with_elapsed(silent)
                .with_timeout(abort_after),
        );
    }
}

//! # Run results.
//!
//! Workers produce [`TaskRecord`]s; the supervisor folds them into one
//! [`SuiteReport`] per basket and a [`RunReport`] for the whole run.

use std::time::Duration;

use crate::error::StartError;

/// Result of one task execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// `run_test` returned `Ok`.
    Passed,
    /// Error, panic, timeout or no-output abort; carries the rendered reason.
    Failed(String),
}

impl TaskOutcome {
    /// True for [`TaskOutcome::Passed`].
    pub fn is_passed(&self) -> bool {
        matches!(self, TaskOutcome::Passed)
    }
}

/// One executed task.
#[derive(Clone, Debug)]
pub struct TaskRecord {
    /// Task id.
    pub task: String,
    /// Name of the worker that ran it.
    pub worker: String,
    /// Outcome.
    pub outcome: TaskOutcome,
    /// Wall time spent in the task.
    pub elapsed: Duration,
}

/// Everything one worker did before it stopped.
#[derive(Clone, Debug, Default)]
pub struct WorkerReport {
    /// Worker name.
    pub worker: String,
    /// Executed tasks in pop order.
    pub records: Vec<TaskRecord>,
    /// Reason the worker left the pool early, if it did.
    pub halted: Option<String>,
}

/// Results for one suite.
#[derive(Clone, Debug, Default)]
pub struct SuiteReport {
    /// Basket key.
    pub key: String,
    /// Executed tasks, grouped by worker in completion order.
    pub records: Vec<TaskRecord>,
    /// Task ids that were queued but never run.
    pub skipped: Vec<String>,
    /// Workers whose server failed to start.
    pub start_failures: Vec<(String, StartError)>,
    /// Workers that left the pool early, with the reason.
    pub halted: Vec<(String, String)>,
    /// Wall time of the suite.
    pub elapsed: Duration,
}

impl SuiteReport {
    /// Empty report for basket `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Folds a worker's report into this one.
    pub fn absorb(&mut self, worker: WorkerReport) {
        if let Some(reason) = worker.halted {
            self.halted.push((worker.worker, reason));
        }
        self.records.extend(worker.records);
    }

    /// Number of passed tasks.
    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_passed()).count()
    }

    /// Number of failed tasks.
    pub fn failed(&self) -> usize {
        self.records.len() - self.passed()
    }

    /// True when every queued task ran and passed on healthy workers.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
            && self.skipped.is_empty()
            && self.start_failures.is_empty()
            && self.halted.is_empty()
    }
}

/// Results of a whole run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// One entry per processed suite, in processing order.
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    /// Number of executed tasks.
    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.records.len()).sum()
    }

    /// Number of passed tasks.
    pub fn passed(&self) -> usize {
        self.suites.iter().map(SuiteReport::passed).sum()
    }

    /// Number of failed tasks.
    pub fn failed(&self) -> usize {
        self.suites.iter().map(SuiteReport::failed).sum()
    }

    /// True when every suite succeeded.
    pub fn is_success(&self) -> bool {
        self.suites.iter().all(SuiteReport::is_success)
    }

    /// Failed tasks as `(suite key, record)` pairs.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &TaskRecord)> {
        self.suites.iter().flat_map(|s| {
            s.records
                .iter()
                .filter(|r| !r.outcome.is_passed())
                .map(move |r| (s.key.as_str(), r))
        })
    }
}

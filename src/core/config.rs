//! # Harness configuration.
//!
//! Provides [`Config`], the explicitly constructed settings value passed by
//! reference into the [`Supervisor`](crate::Supervisor), every
//! [`Worker`](crate::Worker) and (through [`Config::poll`], via
//! [`LogWatcher::with_config`](crate::LogWatcher::with_config) or
//! [`WorkerContext::log_watcher`](crate::WorkerContext::log_watcher)) every
//! [`LogWatcher`](crate::LogWatcher). There is no process-wide instance.
//!
//! ## Sentinel values
//! - `repeat = 0` → feed the suite's tasks until shutdown is requested (stress mode)
//! - `task_timeout = 0s` → no per-task timeout
//! - `no_output_timeout = 0s` → no-output watchdog disabled
//! - `workers = 0` → treated as 1

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Configuration for one harness run.
///
/// ## Field semantics
/// - `workers`: concurrent workers (and server instances) per suite
/// - `vardir`: root of all worker working directories
/// - `repeat`: how many times each suite's task list is fed (`0` = forever)
/// - `grace`: maximum wait for workers to release their servers after a shutdown request
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `task_timeout`: hard limit for one test (`0s` = none)
/// - `no_output_timeout`: abort a test that stays silent this long (`0s` = disabled)
/// - `no_output_warn_period`: interval between "No output during ..." warnings
/// - `server_start_timeout`: readiness deadline handed to suites for their servers
/// - `poll`: sleep policy for log tailing
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of workers per suite.
    pub workers: usize,

    /// Root directory for worker working directories (`<vardir>/<NN>_<suite>`).
    pub vardir: PathBuf,

    /// Number of rounds each suite's tasks are fed to the queue.
    ///
    /// - `1` = run every task once (normal mode)
    /// - `n > 1` = stress mode, `n` rounds
    /// - `0` = stress mode until shutdown is requested
    pub repeat: usize,

    /// Maximum time to wait for workers to stop after a shutdown request.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Per-task timeout (`Duration::ZERO` = none).
    pub task_timeout: Duration,

    /// Silence window after which a running task is aborted (`Duration::ZERO` = disabled).
    pub no_output_timeout: Duration,

    /// Interval between two "No output during ..." warnings for one task.
    pub no_output_warn_period: Duration,

    /// Deadline for a server to report readiness in its log.
    pub server_start_timeout: Duration,

    /// Sleep policy used while tailing log files.
    pub poll: BackoffPolicy,
}

impl Config {
    /// Returns the number of workers, never less than one.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// Returns the number of feeding rounds as an `Option`.
    ///
    /// - `None` → repeat until shutdown
    /// - `Some(n)` → exactly `n` rounds
    #[inline]
    pub fn repeat_limit(&self) -> Option<usize> {
        if self.repeat == 0 {
            None
        } else {
            Some(self.repeat)
        }
    }

    /// Returns the per-task timeout as an `Option`.
    #[inline]
    pub fn task_timeout(&self) -> Option<Duration> {
        if self.task_timeout == Duration::ZERO {
            None
        } else {
            Some(self.task_timeout)
        }
    }

    /// Returns the no-output watchdog window as an `Option`.
    #[inline]
    pub fn no_output_timeout(&self) -> Option<Duration> {
        if self.no_output_timeout == Duration::ZERO {
            None
        } else {
            Some(self.no_output_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 1`
    /// - `vardir = "var"`
    /// - `repeat = 1` (normal mode)
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `task_timeout = 0s` (none)
    /// - `no_output_timeout = 120s`, warned every `10s`
    /// - `server_start_timeout = 90s`
    /// - `poll = BackoffPolicy::default()`
    fn default() -> Self {
        Self {
            workers: 1,
            vardir: PathBuf::from("var"),
            repeat: 1,
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            task_timeout: Duration::ZERO,
            no_output_timeout: Duration::from_secs(120),
            no_output_warn_period: Duration::from_secs(10),
            server_start_timeout: Duration::from_secs(90),
            poll: BackoffPolicy::default(),
        }
    }
}

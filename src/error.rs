//! Error types used by the testvisor runtime, its workers and the log watcher.
//!
//! - [`StartError`]: a managed server exited (or never became ready) before the
//!   expected log line appeared.
//! - [`TaskError`]: a single test execution failed; always contained by the worker.
//! - [`QueueError`]: misuse of the [`TaskQueue`](crate::TaskQueue) protocol.
//! - [`HarnessError`]: invariant violations that halt one worker.
//! - [`RuntimeError`]: failures of the pool driver itself.
//!
//! All enums provide `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` helpers.

use std::time::Duration;
use thiserror::Error;

use crate::core::RunReport;

/// Renders a duration as whole seconds when possible (`30`), fractional otherwise (`0.25`).
pub(crate) fn fmt_secs(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        format!("{}", d.as_secs_f64())
    }
}

/// # Server start failure.
///
/// Carries the instance name and, when the failure is a readiness deadline, the
/// timeout that was reached.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use testvisor::StartError;
///
/// let err = StartError::timed_out("replica", Duration::from_secs(30));
/// assert_eq!(err.to_string(), "[Instance 'replica'] Start timeout 30 was reached.");
///
/// let err = StartError::failed("master");
/// assert_eq!(err.to_string(), "failed: master");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", self.as_message())]
pub struct StartError {
    /// Instance name, if known.
    pub name: Option<String>,
    /// Readiness timeout that was reached, if this is a timeout failure.
    pub timeout: Option<Duration>,
}

impl StartError {
    /// The process exited before producing the expected log line.
    pub fn failed(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            timeout: None,
        }
    }

    /// The expected log line did not appear within `timeout`.
    pub fn timed_out(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: Some(name.into()),
            timeout: Some(timeout),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self.timeout {
            Some(_) => "start_timeout",
            None => "start_failed",
        }
    }

    /// Returns the canonical rendering of this failure.
    pub fn as_message(&self) -> String {
        let name = self.name.as_deref().unwrap_or("");
        match self.timeout {
            Some(t) => format!("[Instance '{name}'] Start timeout {} was reached.", fmt_secs(t)),
            None => format!("failed: {name}"),
        }
    }
}

/// # Errors produced while tailing a log file.
///
/// A pattern that never appears is **not** an error: `seek_wait` returns
/// `Ok(false)` for that.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LogError {
    /// The watched process exited (or a readiness deadline passed).
    #[error(transparent)]
    Start(#[from] StartError),

    /// The search pattern is not a valid regular expression.
    #[error("invalid log pattern: {0}")]
    Pattern(#[from] regex_lite::Error),

    /// Reading the log file failed.
    #[error("log read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LogError::Start(e) => e.as_label(),
            LogError::Pattern(_) => "log_pattern_invalid",
            LogError::Io(_) => "log_io",
        }
    }

    /// Returns the start failure, if this is one.
    pub fn as_start(&self) -> Option<&StartError> {
        match self {
            LogError::Start(e) => Some(e),
            _ => None,
        }
    }
}

/// # Errors produced by a single test execution.
///
/// The worker turns every variant into a failed
/// [`TaskOutcome`](crate::TaskOutcome); none of them stop the worker loop.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The test ran and failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The test exceeded its configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The test produced no result for the whole no-output window and was aborted.
    #[error("no output during {after:?}; aborted")]
    NoOutput {
        /// Length of the silent window.
        after: Duration,
    },

    /// The test panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// The worker was cancelled while the test was running.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use testvisor::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::NoOutput { .. } => "task_no_output",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::NoOutput { after } => format!("no output: {after:?}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Text used for the failure status line: the bare error for `Fail`,
    /// the full rendering otherwise.
    pub fn reason(&self) -> String {
        match self {
            TaskError::Fail { error } => error.clone(),
            other => other.to_string(),
        }
    }
}

impl From<StartError> for TaskError {
    fn from(e: StartError) -> Self {
        TaskError::Fail {
            error: e.to_string(),
        }
    }
}

impl From<LogError> for TaskError {
    fn from(e: LogError) -> Self {
        TaskError::Fail {
            error: e.to_string(),
        }
    }
}

/// Protocol violations on a [`TaskQueue`](crate::TaskQueue).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// `ack` called more times than items were pushed.
    #[error("ack without a matching pop")]
    AckWithoutPop,

    /// The queue was closed while a consumer was waiting.
    #[error("queue closed")]
    Closed,
}

/// Invariant violations that halt one worker's participation in the pool.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HarnessError {
    /// A task id popped from the queue has no descriptor in the worker's suite.
    #[error("suite '{suite}' has no task named '{task}'")]
    UnknownTask {
        /// Suite path.
        suite: String,
        /// Offending id.
        task: String,
    },

    /// The worker was asked to run a task after releasing its server.
    #[error("worker '{worker}' has no server")]
    ServerReleased {
        /// Worker name.
        worker: String,
    },

    /// The shared queue rejected an operation.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl HarnessError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HarnessError::UnknownTask { .. } => "unknown_task",
            HarnessError::ServerReleased { .. } => "server_released",
            HarnessError::Queue(_) => "queue_protocol",
        }
    }
}

/// # Errors produced by the pool driver.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers had to be abandoned.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the workers that did not stop in time.
        stuck: Vec<String>,
    },

    /// Shutdown was requested before every suite finished; carries what did run.
    #[error("run interrupted by shutdown request")]
    Interrupted {
        /// Results collected up to the interruption.
        report: Box<RunReport>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use testvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Interrupted { .. } => "runtime_interrupted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            RuntimeError::Interrupted { report } => {
                format!("interrupted after {} task(s)", report.total())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_error_renderings() {
        let timeout = StartError::timed_out("replica", Duration::from_secs(30));
        assert_eq!(
            timeout.to_string(),
            "[Instance 'replica'] Start timeout 30 was reached."
        );
        assert_eq!(timeout.as_label(), "start_timeout");

        let failed = StartError::failed("master");
        assert_eq!(failed.to_string(), "failed: master");
        assert_eq!(failed.as_label(), "start_failed");
    }

    #[test]
    fn fractional_timeout_keeps_precision() {
        let err = StartError::timed_out("x", Duration::from_millis(250));
        assert_eq!(err.to_string(), "[Instance 'x'] Start timeout 0.25 was reached.");
    }

    #[test]
    fn start_error_inside_a_test_keeps_its_rendering() {
        let err: TaskError = StartError::timed_out("replica", Duration::from_secs(30)).into();
        assert_eq!(err.as_label(), "task_failed");
        assert_eq!(err.reason(), "[Instance 'replica'] Start timeout 30 was reached.");
    }

    #[test]
    fn unnamed_start_error() {
        assert_eq!(StartError::default().to_string(), "failed: ");
    }
}

//! # StatusFile: canonical status log
//!
//! Appends one or more lines per event to a file. Downstream tooling (negative
//! tests, CI log scrapers) tails that file with
//! [`LogWatcher`](crate::LogWatcher), so the line shapes below are stable:
//!
//! ```text
//! [01_box] hang.test.lua [ pass ]
//! [01_box] No output during 10 seconds. Will abort after 60 seconds
//! [01_box] hang.test.lua: [Instance 'replica'] Start timeout 30 was reached.
//! [01_box] hang.test.lua [ fail ]
//! [02_box] failed to start: failed: 02_box
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::fmt_secs;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Renders the status line(s) for an event, or `None` for events that have no
/// status representation.
pub fn status_line(e: &Event) -> Option<String> {
    let worker = e.worker.as_deref().unwrap_or("--");
    let task = e.task.as_deref().unwrap_or("");
    let line = match e.kind {
        EventKind::TaskPassed => format!("[{worker}] {task} [ pass ]"),
        EventKind::TaskFailed => match e.reason.as_deref() {
            Some(reason) => format!("[{worker}] {task}: {reason}\n[{worker}] {task} [ fail ]"),
            None => format!("[{worker}] {task} [ fail ]"),
        },
        EventKind::NoOutput => format!(
            "[{worker}] No output during {} seconds. Will abort after {} seconds",
            fmt_secs(e.elapsed.unwrap_or_default()),
            fmt_secs(e.timeout.unwrap_or_default()),
        ),
        EventKind::WorkerStartFailed => format!(
            "[{worker}] failed to start: {}",
            e.reason.as_deref().unwrap_or("unknown")
        ),
        EventKind::WorkerHalted => format!(
            "[{worker}] halted: {}",
            e.reason.as_deref().unwrap_or("unknown")
        ),
        EventKind::GraceExceeded => "[--] shutdown grace exceeded".to_string(),
        _ => return None,
    };
    Some(line)
}

/// File-backed status writer.
pub struct StatusFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl StatusFile {
    /// Opens (creating or appending to) the status file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the status file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Subscribe for StatusFile {
    async fn on_event(&self, e: &Event) {
        let Some(mut line) = status_line(e) else {
            return;
        };
        line.push('\n');

        let mut file = self.file.lock().await;
        let res = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = res {
            tracing::warn!(path = %self.path.display(), %err, "status line not written");
        }
    }

    fn accepts(&self, kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::TaskPassed
                | EventKind::TaskFailed
                | EventKind::NoOutput
                | EventKind::WorkerStartFailed
                | EventKind::WorkerHalted
                | EventKind::GraceExceeded
        )
    }

    fn name(&self) -> &'static str {
        "StatusFile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn no_output_line_matches_canonical_shape() {
        let ev = Event::new(EventKind::NoOutput)
            .with_worker("01_box")
            .with_elapsed(Duration::from_secs(10))
            .with_timeout(Duration::from_secs(60));
        assert_eq!(
            status_line(&ev).as_deref(),
            Some("[01_box] No output during 10 seconds. Will abort after 60 seconds")
        );
    }

    #[test]
    fn failed_task_reports_reason_before_fail_marker() {
        let ev = Event::new(EventKind::TaskFailed)
            .with_worker("01_box")
            .with_task("hang.test.lua")
            .with_reason("[Instance 'replica'] Start timeout 30 was reached.");
        let line = status_line(&ev).expect("line");
        let mut lines = line.lines();
        assert!(lines.next().expect("reason").ends_with("Start timeout 30 was reached."));
        assert_eq!(lines.next(), Some("[01_box] hang.test.lua [ fail ]"));
    }

    #[test]
    fn lifecycle_events_have_no_status_line() {
        assert!(status_line(&Event::new(EventKind::TaskStarting)).is_none());
        assert!(status_line(&Event::new(EventKind::WorkerReady)).is_none());
    }

    #[tokio::test]
    async fn accepts_exactly_the_rendered_kinds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = StatusFile::open(dir.path().join("status.log")).await.expect("open");
        let kinds = [
            EventKind::SuiteStarting,
            EventKind::WorkerStarting,
            EventKind::WorkerReady,
            EventKind::WorkerStartFailed,
            EventKind::WorkerHalted,
            EventKind::WorkerStopped,
            EventKind::TaskStarting,
            EventKind::TaskPassed,
            EventKind::TaskFailed,
            EventKind::TimeoutHit,
            EventKind::NoOutput,
            EventKind::ShutdownRequested,
            EventKind::GraceExceeded,
        ];
        for kind in kinds {
            let ev = Event::new(kind).with_worker("01_a").with_task("t");
            assert_eq!(sink.accepts(kind), status_line(&ev).is_some(), "{kind:?}");
        }
    }

    #[tokio::test]
    async fn appends_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("status.log");
        let sink = StatusFile::open(&path).await.expect("open");

        sink.on_event(&Event::new(EventKind::TaskPassed).with_worker("01_a").with_task("t1"))
            .await;
        sink.on_event(&Event::new(EventKind::TaskStarting)).await;
        sink.on_event(&Event::new(EventKind::TaskPassed).with_worker("01_a").with_task("t2"))
            .await;

        let text = std::fs::read_to_string(&path).expect("read");
        assert_eq!(text, "[01_a] t1 [ pass ]\n[01_a] t2 [ pass ]\n");
    }
}

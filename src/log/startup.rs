//! Readiness wait for freshly started servers.

use std::time::Duration;

use crate::error::{LogError, StartError};
use crate::log::{Liveness, LogWatcher, SeekOptions};

/// Waits until `pattern` appears in the server log after the watcher's cursor.
///
/// Typical use inside [`Suite::start_server`](crate::Suite::start_server):
/// call [`LogWatcher::positioning`] before spawning the process, then this.
///
/// # Errors
/// - [`StartError::failed`] if `process` exits before the line appears;
/// - [`StartError::timed_out`] if the line does not appear within `timeout`;
/// - [`LogError::Pattern`] / [`LogError::Io`] as for [`LogWatcher::seek_wait`].
pub async fn await_ready(
    watcher: &mut LogWatcher,
    process: &mut dyn Liveness,
    name: &str,
    pattern: &str,
    timeout: Duration,
) -> Result<(), LogError> {
    let opts = SeekOptions::new()
        .process(process)
        .name(name)
        .timeout(timeout)
        .from_last_match();

    if watcher.seek_wait(pattern, opts).await? {
        tracing::debug!(instance = name, pattern, "server reported readiness");
        Ok(())
    } else {
        Err(StartError::timed_out(name, timeout).into())
    }
}

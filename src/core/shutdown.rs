//! # Shutdown triggers.
//!
//! A run stops early when the process receives a termination signal or when
//! [`Supervisor::cancel`](crate::Supervisor::cancel) is called. Both paths end
//! in [`requested`].
//!
//! Unix: `SIGINT`, `SIGTERM`, `SIGQUIT`. Elsewhere: Ctrl-C.

use tokio_util::sync::CancellationToken;

/// Resolves on a termination signal or when `token` is cancelled.
///
/// If the signal handlers cannot be installed only `token` can end the wait.
pub(crate) async fn requested(token: &CancellationToken) {
    tokio::select! {
        res = termination_signal() => {
            if let Err(err) = res {
                tracing::warn!(%err, "signal handlers unavailable; only cancel() stops the run");
                token.cancelled().await;
            }
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = interrupt.recv() => tracing::info!("SIGINT received"),
        _ = terminate.recv() => tracing::info!("SIGTERM received"),
        _ = quit.recv() => tracing::info!("SIGQUIT received"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received");
    Ok(())
}

//! # OS termination signals.
//!
//! **Unix:** `SIGINT`, `SIGTERM` (systemd, Kubernetes), `SIGQUIT`.
//! **Other platforms:** Ctrl-C.

use crate::error::RuntimeError;

/// Completes when the process receives a termination signal.
///
/// Each call registers its own listeners.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> Result<(), RuntimeError> {
    use tokio::signal::unix::{SignalKind, signal};

    let listen = |kind| signal(kind).map_err(RuntimeError::Signal);
    let mut interrupt = listen(SignalKind::interrupt())?;
    let mut terminate = listen(SignalKind::terminate())?;
    let mut quit = listen(SignalKind::quit())?;

    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
        _ = quit.recv() => {},
    }
    Ok(())
}

/// Completes when the process receives Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> Result<(), RuntimeError> {
    tokio::signal::ctrl_c().await.map_err(RuntimeError::Signal)
}

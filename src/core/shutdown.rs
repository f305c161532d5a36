//! # Cross-platform OS signal handling.
//!
//! Provides [`wait_for_shutdown_signal`], an async helper that completes when
//! the host process receives a termination signal. Used by
//! [`ProcessRegistry::drain_on_signal`](crate::ProcessRegistry::drain_on_signal)
//! to guarantee that no external-tool process outlives the host.
//!
//! On Unix the waiter listens for `SIGINT`, `SIGTERM` and `SIGQUIT` alongside
//! Ctrl-C; elsewhere only Ctrl-C is available.

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners. Returns `Ok(())` when any
/// signal is received, or `Err` if signal registration fails.
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigquit = signal(SignalKind::quit())?;

        tokio::select! {
            r = tokio::signal::ctrl_c() => r,
            _ = sigint.recv()  => Ok(()),
            _ = sigterm.recv() => Ok(()),
            _ = sigquit.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

//! Signal-driven shutdown
//!
//! Replaces the keep-alive spin of the original workflow with a blocking
//! wait: a cancellation token fans the termination signal out to the
//! accept loop, every session, and the coordinator.

use eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Install a handler that cancels the returned token on SIGINT or SIGTERM.
///
/// All subsystems watch this token and drain gracefully.
pub fn install_handler() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let trigger = token.clone();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => warn!("SIGINT received"),
                _ = sigterm.recv() => warn!("SIGTERM received"),
            }
            trigger.cancel();
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received");
            }
            trigger.cancel();
        });
    }

    Ok(token)
}

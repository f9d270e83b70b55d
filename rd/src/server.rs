//! Server assembly: listener, coordinator, and session tasks
//!
//! Accepts exactly the configured number of participant connections,
//! assigning identities in acceptance order, then stops listening for the
//! life of the process. Each connection gets its own session task, tracked
//! in a `JoinSet` so shutdown can wait for all of them.

use std::net::SocketAddr;

use eyre::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::session;

/// A bound, not-yet-running coordination server.
pub struct Server {
    listener: TcpListener,
    participants: usize,
    coordinator_config: CoordinatorConfig,
    shutdown: CancellationToken,
}

impl Server {
    /// Bind the listener. Failing to bind is fatal for the process; the
    /// server cannot function without its socket.
    pub async fn bind(config: &Config, shutdown: CancellationToken) -> Result<Self> {
        let listener = TcpListener::bind(&config.server.bind)
            .await
            .context(format!("failed to bind {}", config.server.bind))?;
        debug!(addr = %listener.local_addr()?, "listener bound");

        Ok(Self {
            listener,
            participants: config.server.participants,
            coordinator_config: config.coordinator.clone(),
            shutdown,
        })
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run until every session has ended or shutdown is requested.
    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            participants,
            coordinator_config,
            shutdown,
        } = self;

        let (coordinator, participant_handles) = Coordinator::new(participants, coordinator_config);
        let coord = coordinator.handle();
        let coordinator_task = tokio::spawn(coordinator.run());

        // a shutdown signal must also stop the coordinator, otherwise
        // sessions blocked in the readiness handshake would never wake
        let stop_coord = coord.clone();
        let stop_token = shutdown.clone();
        tokio::spawn(async move {
            stop_token.cancelled().await;
            let _ = stop_coord.shutdown().await;
        });

        let mut sessions = JoinSet::new();
        let mut accepted = 0usize;
        for handle in participant_handles {
            let id = handle.participant_id();
            let stream = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(accepted, expected = participants, "shutdown before all participants connected");
                    break;
                }
                result = listener.accept() => {
                    let (stream, peer) = result.context("accept() failed")?;
                    info!(participant = id, %peer, "participant connected");
                    stream
                }
            };

            accepted += 1;
            let token = shutdown.clone();
            sessions.spawn(async move {
                if let Err(e) = session::run(stream, handle, token).await {
                    warn!(participant = id, error = %e, "session ended with error");
                }
            });
        }
        drop(listener);
        if accepted == participants {
            info!(participants, "all participants connected; no longer accepting");
        }

        // sessions run until their participant leaves or shutdown fires
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "session task failed");
            }
        }

        match coord.metrics().await {
            Ok(metrics) => info!(
                updates = metrics.updates_received,
                notifications = metrics.notifications_posted,
                reviews = metrics.reviews_assigned,
                tasks = metrics.tasks_dispatched,
                "all sessions finished"
            ),
            Err(_) => debug!("coordinator already stopped"),
        }

        let _ = coord.shutdown().await;
        let _ = coordinator_task.await;
        info!("server stopped");
        Ok(())
    }
}

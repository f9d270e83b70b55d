//! Handles for talking to the coordinator task

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{CoordRequest, CoordinatorMetrics, ParticipantId, ProgramStatus, Task};

/// Clonable control-plane handle (metrics, shutdown).
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordRequest>,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest>) -> Self {
        Self { tx }
    }

    /// Get current coordinator metrics.
    pub async fn metrics(&self) -> Result<CoordinatorMetrics> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        reply_rx.await.map_err(|_| eyre!("Coordinator shutdown before reply"))
    }

    /// Request shutdown of the coordinator.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(CoordRequest::Shutdown)
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        Ok(())
    }
}

/// Per-participant handle owned by that participant's session.
///
/// Pairs the shared request sender with this identity's readiness receiver,
/// so the blocking half of the handshake can only ever consume this
/// participant's own notifications.
#[derive(Debug)]
pub struct ParticipantHandle {
    participant_id: ParticipantId,
    participants: usize,
    tx: mpsc::Sender<CoordRequest>,
    notify_rx: mpsc::UnboundedReceiver<()>,
}

impl ParticipantHandle {
    pub(crate) fn new(
        participant_id: ParticipantId,
        participants: usize,
        tx: mpsc::Sender<CoordRequest>,
        notify_rx: mpsc::UnboundedReceiver<()>,
    ) -> Self {
        Self {
            participant_id,
            participants,
            tx,
            notify_rx,
        }
    }

    /// This handle's participant identity.
    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Size of the participant pool.
    pub fn participants(&self) -> usize {
        self.participants
    }

    #[cfg(test)]
    pub(crate) fn request_sender(&self) -> &mpsc::Sender<CoordRequest> {
        &self.tx
    }

    /// Forward a status update to the coordinator.
    pub async fn update(&self, program_id: ParticipantId, status: ProgramStatus) -> Result<()> {
        debug!(
            participant = self.participant_id,
            program = program_id,
            ?status,
            "ParticipantHandle::update"
        );
        self.tx
            .send(CoordRequest::Update { program_id, status })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        Ok(())
    }

    /// Consume one readiness notification, then fetch the concrete task.
    ///
    /// Blocks until the coordinator posts a notification for this
    /// participant. Returns `Ok(None)` if the coordinator shut down while
    /// waiting; an empty next-task reply after a consumed notification is a
    /// contract violation and surfaces as an error.
    pub async fn await_task(&mut self) -> Result<Option<Task>> {
        debug!(participant = self.participant_id, "waiting for readiness notification");
        if self.notify_rx.recv().await.is_none() {
            debug!(participant = self.participant_id, "readiness channel closed");
            return Ok(None);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordRequest::NextTask {
                participant_id: self.participant_id,
                reply_tx,
            })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        let task = reply_rx
            .await
            .map_err(|_| eyre!("Coordinator shutdown before reply"))?
            .ok_or_else(|| {
                eyre!(
                    "no task for participant {} despite a consumed readiness notification",
                    self.participant_id
                )
            })?;
        Ok(Some(task))
    }

    /// Tell the coordinator this participant's session has ended.
    pub async fn disconnect(&self) -> Result<()> {
        self.tx
            .send(CoordRequest::Disconnect {
                participant_id: self.participant_id,
            })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_identity() {
        let (tx, _rx) = mpsc::channel(8);
        let (_notify_tx, notify_rx) = mpsc::unbounded_channel();

        let handle = ParticipantHandle::new(2, 3, tx, notify_rx);
        assert_eq!(handle.participant_id(), 2);
        assert_eq!(handle.participants(), 3);
    }

    #[tokio::test]
    async fn test_await_task_reports_closed_coordinator() {
        let (tx, _rx) = mpsc::channel(8);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let mut handle = ParticipantHandle::new(0, 2, tx, notify_rx);
        drop(notify_tx);

        let result = handle.await_task().await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_update_fails_after_coordinator_gone() {
        let (tx, rx) = mpsc::channel(8);
        let (_notify_tx, notify_rx) = mpsc::unbounded_channel();
        drop(rx);

        let handle = ParticipantHandle::new(0, 2, tx, notify_rx);
        assert!(handle.update(0, ProgramStatus::Writing).await.is_err());
    }
}

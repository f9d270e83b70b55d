//! Per-connection participant session
//!
//! Greets the participant with its initial writing task, then loops:
//! decode one update, forward it to the coordinator, and — whenever the
//! update's status requires a reply — block on this participant's
//! readiness notification and hand back the next task. The session has
//! exactly two suspension points: the wire read and that notification.

use eyre::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::{ParticipantHandle, ProgramStatus, Task};
use crate::net::wire::{self, Frame};

/// Drive one participant connection to completion.
///
/// Returns when the participant sends the disconnect sentinel, the shutdown
/// token fires, or the coordinator goes away; transport and contract faults
/// surface as errors. The participant's slot is released on every exit path.
pub async fn run<S>(
    mut stream: S,
    mut coordinator: ParticipantHandle,
    shutdown: CancellationToken,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let result = drive(&mut stream, &mut coordinator, &shutdown).await;
    // free the slot whatever ended the session; the send only fails if the
    // coordinator is already gone
    let _ = coordinator.disconnect().await;
    result
}

async fn drive<S>(
    stream: &mut S,
    coordinator: &mut ParticipantHandle,
    shutdown: &CancellationToken,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let participant_id = coordinator.participant_id();

    // every participant starts out writing its own program
    let initial = Task {
        program_id: participant_id,
        status: ProgramStatus::Writing,
    };
    wire::write_frame(stream, Frame::from_task(initial))
        .await
        .context("failed to send initial task")?;
    debug!(participant = participant_id, "initial writing task sent");

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(participant = participant_id, "session cancelled by shutdown");
                return Ok(());
            }
            frame = wire::read_frame(stream) => {
                frame.context("failed to read update")?
            }
        };

        if frame.is_disconnect() {
            info!(participant = participant_id, "participant disconnected");
            return Ok(());
        }

        let (program_id, status) = wire::decode_update(frame, coordinator.participants())?;
        debug!(
            participant = participant_id,
            program = program_id,
            ?status,
            "update received"
        );
        coordinator.update(program_id, status).await?;

        if status.expects_reply() {
            // the participant is idle now; block until the coordinator has
            // something for this identity
            let Some(task) = coordinator.await_task().await? else {
                debug!(participant = participant_id, "coordinator gone while waiting for a task");
                return Ok(());
            };
            debug!(participant = participant_id, ?task, "dispatching task");
            wire::write_frame(stream, Frame::from_task(task))
                .await
                .context("failed to send task")?;
        }
    }
}

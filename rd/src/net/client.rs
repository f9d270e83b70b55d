//! Participant-side protocol client
//!
//! Follows the blocking request/response rhythm a programmer client keeps
//! with the server: read a task, work, report, read the next task. Used by
//! the `simulate` command and the integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use eyre::{Context, Result, eyre};
use tokio::net::TcpStream;

use crate::coordinator::{ParticipantId, ProgramStatus, Task};
use crate::net::wire::{self, Frame};

/// Default timeout for protocol operations
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client side of one participant connection.
#[derive(Debug)]
pub struct ParticipantClient {
    stream: TcpStream,
    timeout: Duration,
}

impl ParticipantClient {
    /// Connect to a coordination server.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = tokio::time::timeout(DEFAULT_TIMEOUT, TcpStream::connect(addr))
            .await
            .context("connection timeout")?
            .context("failed to connect to server")?;
        Ok(Self {
            stream,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set a custom timeout for subsequent operations.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Receive the next task from the server (the initial greeting or the
    /// reply to an update that expects one).
    pub async fn recv_task(&mut self) -> Result<Task> {
        let frame = tokio::time::timeout(self.timeout, wire::read_frame(&mut self.stream))
            .await
            .context("timed out waiting for a task")?
            .context("failed to read task")?;

        let program_id: ParticipantId = usize::try_from(frame.program_id)
            .map_err(|_| eyre!("server sent invalid program id {}", frame.program_id))?;
        let status = ProgramStatus::from_wire(frame.status)
            .ok_or_else(|| eyre!("server sent unknown status code {}", frame.status))?;
        Ok(Task { program_id, status })
    }

    /// Report a status change for a program.
    pub async fn send_update(&mut self, program_id: ParticipantId, status: ProgramStatus) -> Result<()> {
        let frame = Frame {
            program_id: program_id as i32,
            status: status.to_wire(),
        };
        tokio::time::timeout(self.timeout, wire::write_frame(&mut self.stream, frame))
            .await
            .context("timed out sending update")?
            .context("failed to send update")?;
        Ok(())
    }

    /// Announce disconnection. The server closes the connection without
    /// replying.
    pub async fn disconnect(mut self) -> Result<()> {
        tokio::time::timeout(self.timeout, wire::write_frame(&mut self.stream, Frame::disconnect()))
            .await
            .context("timed out sending disconnect")?
            .context("failed to send disconnect")?;
        Ok(())
    }
}

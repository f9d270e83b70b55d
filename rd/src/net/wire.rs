//! Fixed-size binary wire protocol
//!
//! Both directions exchange one 8-byte frame per logical step: two
//! big-endian i32s `{ program_id, status }`. A participant announces
//! disconnection with `program_id = -1`; the status field of that frame
//! carries no meaning and the server does not reply.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::coordinator::{ParticipantId, ProgramStatus, Task};

/// Size of one frame on the wire.
pub const FRAME_LEN: usize = 8;

/// Sentinel program id announcing a disconnecting participant.
pub const DISCONNECT_ID: i32 = -1;

/// Transport and framing faults. Fatal for the connection they occur on,
/// never for the server as a whole.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("connection closed mid-protocol")]
    Closed,

    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("unknown status code {0}")]
    UnknownStatus(i32),

    #[error("program id {0} out of range for a pool of {1}")]
    BadProgramId(i32, usize),
}

/// One raw frame as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub program_id: i32,
    pub status: i32,
}

impl Frame {
    /// The disconnection handshake frame.
    pub fn disconnect() -> Self {
        Self {
            program_id: DISCONNECT_ID,
            status: 0,
        }
    }

    pub fn from_task(task: Task) -> Self {
        Self {
            program_id: task.program_id as i32,
            status: task.status.to_wire(),
        }
    }

    pub fn is_disconnect(&self) -> bool {
        self.program_id == DISCONNECT_ID
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[..4].copy_from_slice(&self.program_id.to_be_bytes());
        buf[4..].copy_from_slice(&self.status.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8; FRAME_LEN]) -> Self {
        Self {
            program_id: i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            status: i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

/// Validate a participant update against the pool size and status table.
pub fn decode_update(frame: Frame, participants: usize) -> Result<(ParticipantId, ProgramStatus), WireError> {
    let program_id = usize::try_from(frame.program_id)
        .ok()
        .filter(|id| *id < participants)
        .ok_or(WireError::BadProgramId(frame.program_id, participants))?;
    let status = ProgramStatus::from_wire(frame.status).ok_or(WireError::UnknownStatus(frame.status))?;
    Ok((program_id, status))
}

/// Read exactly one frame. Any EOF, clean or mid-frame, maps to
/// [`WireError::Closed`] since the protocol ends with an explicit sentinel,
/// not a close.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; FRAME_LEN];
    match reader.read_exact(&mut buf).await {
        Ok(_) => Ok(Frame::decode(&buf)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(WireError::Closed),
        Err(e) => Err(e.into()),
    }
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, frame: Frame) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout_is_big_endian() {
        let frame = Frame {
            program_id: 1,
            status: 4,
        };
        assert_eq!(frame.encode(), [0, 0, 0, 1, 0, 0, 0, 4]);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let frames = [
            Frame {
                program_id: 0,
                status: 0,
            },
            Frame {
                program_id: 2,
                status: 3,
            },
            Frame::disconnect(),
        ];
        for frame in frames {
            assert_eq!(Frame::decode(&frame.encode()), frame);
        }
    }

    #[test]
    fn test_disconnect_sentinel() {
        assert!(Frame::disconnect().is_disconnect());
        assert!(
            Frame {
                program_id: -1,
                status: 3,
            }
            .is_disconnect()
        );
        assert!(
            !Frame {
                program_id: 0,
                status: 0,
            }
            .is_disconnect()
        );
    }

    #[test]
    fn test_decode_update_validates_bounds() {
        let ok = decode_update(
            Frame {
                program_id: 2,
                status: 1,
            },
            3,
        )
        .unwrap();
        assert_eq!(ok, (2, ProgramStatus::AwaitingReview));

        assert!(matches!(
            decode_update(
                Frame {
                    program_id: 3,
                    status: 1,
                },
                3,
            ),
            Err(WireError::BadProgramId(3, 3))
        ));
        assert!(matches!(
            decode_update(
                Frame {
                    program_id: -7,
                    status: 1,
                },
                3,
            ),
            Err(WireError::BadProgramId(-7, 3))
        ));
        assert!(matches!(
            decode_update(
                Frame {
                    program_id: 0,
                    status: 9,
                },
                3,
            ),
            Err(WireError::UnknownStatus(9))
        ));
    }

    #[tokio::test]
    async fn test_frame_io_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let sent = Frame {
            program_id: 1,
            status: 1,
        };
        write_frame(&mut client, sent).await.unwrap();
        let received = read_frame(&mut server).await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_short_frame_is_a_transport_fault() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&[0, 0, 0]).await.unwrap();
        drop(client);

        let result = read_frame(&mut server).await;
        assert!(matches!(result, Err(WireError::Closed)));
    }

    #[tokio::test]
    async fn test_clean_close_maps_to_closed() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        assert!(matches!(read_frame(&mut server).await, Err(WireError::Closed)));
    }
}

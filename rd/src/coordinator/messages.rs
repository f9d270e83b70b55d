//! Message and domain types for the coordinator

use tokio::sync::oneshot;

/// Identity of a connected programmer, assigned in acceptance order.
/// Doubles as the id of the program that participant authors.
pub type ParticipantId = usize;

/// Lifecycle status of a program.
///
/// `InReview` and `Fixing` are representable on the wire but never produced
/// by the transition logic; an update carrying one of them is stored with no
/// further effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    /// The author is writing the program.
    Writing,
    /// The program has been handed over for peer review.
    AwaitingReview,
    /// A reviewer is actively reviewing.
    InReview,
    /// The review bounced the program back to its author.
    Rejected,
    /// The review passed the program.
    Accepted,
    /// The author is reworking a rejected program.
    Fixing,
}

impl ProgramStatus {
    /// Decode a wire status code.
    pub fn from_wire(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Writing),
            1 => Some(Self::AwaitingReview),
            2 => Some(Self::InReview),
            3 => Some(Self::Rejected),
            4 => Some(Self::Accepted),
            5 => Some(Self::Fixing),
            _ => None,
        }
    }

    /// Encode for the wire.
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Writing => 0,
            Self::AwaitingReview => 1,
            Self::InReview => 2,
            Self::Rejected => 3,
            Self::Accepted => 4,
            Self::Fixing => 5,
        }
    }

    /// Whether an update with this status obliges the server to answer with
    /// the sender's next task.
    pub fn expects_reply(self) -> bool {
        matches!(self, Self::AwaitingReview | Self::Rejected | Self::Accepted)
    }
}

/// The `{program, status}` pair a participant is instructed to act on next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub program_id: ParticipantId,
    pub status: ProgramStatus,
}

/// Per-participant program slot tracked by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    pub status: ProgramStatus,
    /// Participant responsible for reviewing this program, fixed for one
    /// review cycle. Never the author.
    pub reviewer: Option<ParticipantId>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            status: ProgramStatus::Writing,
            reviewer: None,
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests processed by the coordinator task.
#[derive(Debug)]
pub enum CoordRequest {
    /// A participant reported a status change for a program.
    Update {
        program_id: ParticipantId,
        status: ProgramStatus,
    },

    /// A participant consumed a readiness notification and wants its
    /// concrete task. `None` in the reply is a contract violation: a
    /// notification was consumed but no task matched.
    NextTask {
        participant_id: ParticipantId,
        reply_tx: oneshot::Sender<Option<Task>>,
    },

    /// A participant's session ended; its slot is inactive.
    Disconnect { participant_id: ParticipantId },

    /// Get current metrics.
    GetMetrics {
        reply_tx: oneshot::Sender<CoordinatorMetrics>,
    },

    /// Shutdown the coordinator.
    Shutdown,
}

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default)]
pub struct CoordinatorMetrics {
    pub updates_received: u64,
    pub notifications_posted: u64,
    pub reviews_assigned: u64,
    pub tasks_dispatched: u64,
    pub active_participants: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_codes() {
        for code in 0..=5 {
            let status = ProgramStatus::from_wire(code).unwrap();
            assert_eq!(status.to_wire(), code);
        }
        assert_eq!(ProgramStatus::from_wire(6), None);
        assert_eq!(ProgramStatus::from_wire(-1), None);
    }

    #[test]
    fn test_expects_reply() {
        assert!(ProgramStatus::AwaitingReview.expects_reply());
        assert!(ProgramStatus::Rejected.expects_reply());
        assert!(ProgramStatus::Accepted.expects_reply());
        assert!(!ProgramStatus::Writing.expects_reply());
        assert!(!ProgramStatus::InReview.expects_reply());
        assert!(!ProgramStatus::Fixing.expects_reply());
    }

    #[test]
    fn test_new_program_is_blank() {
        let program = Program::new();
        assert_eq!(program.status, ProgramStatus::Writing);
        assert_eq!(program.reviewer, None);
    }
}

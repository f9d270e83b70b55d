//! Main Coordinator task implementation
//!
//! The coordinator is the single mutual-exclusion domain for the shared
//! program table: one actor task owns the table outright and applies every
//! transition and every next-task query from its mailbox, so concurrent
//! sessions can never observe a half-applied update. Readiness
//! notifications travel over separate per-participant channels and are
//! posted without ever blocking the actor.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::handle::{CoordinatorHandle, ParticipantHandle};
use super::messages::{CoordRequest, CoordinatorMetrics, ParticipantId, Program, ProgramStatus, Task};

/// The coordinator mediates the review workflow for a fixed participant pool
pub struct Coordinator {
    rx: mpsc::Receiver<CoordRequest>,
    tx: mpsc::Sender<CoordRequest>,
    state: State,
}

impl Coordinator {
    /// Create a coordinator for `participants` slots, returning one
    /// `ParticipantHandle` per identity in order.
    ///
    /// All readiness channels are created here, before any session runs, so
    /// a notification posted for a participant that has not yet started its
    /// handshake is queued rather than lost.
    pub fn new(participants: usize, config: CoordinatorConfig) -> (Self, Vec<ParticipantHandle>) {
        let (tx, rx) = mpsc::channel(config.channel_buffer);

        let mut notify_txs = Vec::with_capacity(participants);
        let mut handles = Vec::with_capacity(participants);
        for id in 0..participants {
            let (notify_tx, notify_rx) = mpsc::unbounded_channel();
            notify_txs.push(notify_tx);
            handles.push(ParticipantHandle::new(id, participants, tx.clone(), notify_rx));
        }

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let coordinator = Self {
            rx,
            tx,
            state: State::new(participants, notify_txs, rng),
        };
        (coordinator, handles)
    }

    /// Get a clonable handle for control-plane requests (metrics, shutdown).
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.tx.clone())
    }

    /// Run the coordinator task.
    ///
    /// Consumes the coordinator and runs until shutdown is requested or
    /// every handle is gone. Dropping the coordinator closes all readiness
    /// channels, which unblocks any session waiting in the handshake.
    pub async fn run(mut self) {
        info!(participants = self.state.programs.len(), "Coordinator started");

        while let Some(req) = self.rx.recv().await {
            match req {
                CoordRequest::Update { program_id, status } => {
                    self.state.apply_update(program_id, status);
                }

                CoordRequest::NextTask {
                    participant_id,
                    reply_tx,
                } => {
                    let task = self.state.next_task(participant_id);
                    debug!(participant = participant_id, ?task, "next-task query");
                    if task.is_some() {
                        self.state.metrics.tasks_dispatched += 1;
                    }
                    let _ = reply_tx.send(task);
                }

                CoordRequest::Disconnect { participant_id } => {
                    self.state.disconnect(participant_id);
                }

                CoordRequest::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(self.state.metrics.clone());
                }

                CoordRequest::Shutdown => {
                    info!("Coordinator shutting down");
                    break;
                }
            }
        }

        info!("Coordinator stopped");
    }
}

/// Table and policy state owned exclusively by the coordinator task.
struct State {
    programs: Vec<Program>,
    active: Vec<bool>,
    notify_txs: Vec<mpsc::UnboundedSender<()>>,
    rng: StdRng,
    metrics: CoordinatorMetrics,
}

impl State {
    fn new(participants: usize, notify_txs: Vec<mpsc::UnboundedSender<()>>, rng: StdRng) -> Self {
        Self {
            programs: vec![Program::new(); participants],
            active: vec![true; participants],
            notify_txs,
            rng,
            metrics: CoordinatorMetrics {
                active_participants: participants,
                ..Default::default()
            },
        }
    }

    /// Apply one status transition and its side effects.
    fn apply_update(&mut self, program_id: ParticipantId, status: ProgramStatus) {
        self.metrics.updates_received += 1;

        let Some(program) = self.programs.get_mut(program_id) else {
            warn!(program = program_id, "update for unknown program slot ignored");
            return;
        };
        program.status = status;
        let cached_reviewer = program.reviewer;
        debug!(program = program_id, ?status, "status updated");

        match status {
            ProgramStatus::AwaitingReview => {
                let reviewer = match cached_reviewer {
                    Some(reviewer) => reviewer,
                    None => {
                        let reviewer = self.pick_reviewer(program_id);
                        self.programs[program_id].reviewer = Some(reviewer);
                        self.metrics.reviews_assigned += 1;
                        info!(program = program_id, reviewer, "reviewer assigned");
                        reviewer
                    }
                };
                self.notify(reviewer);
            }
            ProgramStatus::Rejected | ProgramStatus::Accepted => {
                // the verdict is ready for the author to act on
                self.notify(program_id);
            }
            ProgramStatus::Writing => {
                // a fresh program invalidates the previous cycle's reviewer
                self.programs[program_id].reviewer = None;
            }
            ProgramStatus::InReview | ProgramStatus::Fixing => {}
        }
    }

    /// Resolve what `participant_id` should do next, scanning in identity
    /// order. Own rejected work wins over pending reviews, which win over
    /// starting fresh after an acceptance.
    fn next_task(&self, participant_id: ParticipantId) -> Option<Task> {
        let own = &self.programs[participant_id];
        if own.status == ProgramStatus::Rejected {
            return Some(Task {
                program_id: participant_id,
                status: ProgramStatus::Rejected,
            });
        }

        for (id, program) in self.programs.iter().enumerate() {
            if id != participant_id
                && program.reviewer == Some(participant_id)
                && program.status == ProgramStatus::AwaitingReview
            {
                return Some(Task {
                    program_id: id,
                    status: ProgramStatus::AwaitingReview,
                });
            }
        }

        if own.status == ProgramStatus::Accepted {
            return Some(Task {
                program_id: participant_id,
                status: ProgramStatus::Accepted,
            });
        }

        None
    }

    /// Uniform pick over all identities except the author's.
    fn pick_reviewer(&mut self, author: ParticipantId) -> ParticipantId {
        let mut pick = self.rng.random_range(0..self.programs.len() - 1);
        if pick >= author {
            pick += 1;
        }
        pick
    }

    /// Post one readiness notification. Never blocks; a closed channel
    /// (participant already gone) just drops the post.
    fn notify(&mut self, participant: ParticipantId) {
        if self.notify_txs[participant].send(()).is_ok() {
            self.metrics.notifications_posted += 1;
            debug!(participant, "readiness notification posted");
        } else {
            warn!(participant, "readiness channel closed; notification dropped");
        }
    }

    fn disconnect(&mut self, participant_id: ParticipantId) {
        if let Some(slot) = self.active.get_mut(participant_id) {
            *slot = false;
        }
        self.metrics.active_participants = self.active.iter().filter(|a| **a).count();
        info!(
            participant = participant_id,
            remaining = self.metrics.active_participants,
            "participant slot inactive"
        );
    }
}

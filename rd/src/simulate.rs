//! Scripted participant pool
//!
//! Drives a running server with programmer clients that behave like the
//! real thing: write, submit, review whatever they are assigned, fix what
//! bounces. Useful as a demo and as a smoke test against a live server.

use std::net::SocketAddr;
use std::time::Duration;

use eyre::Result;
use rand::Rng;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::coordinator::{ParticipantId, ProgramStatus};
use crate::net::client::ParticipantClient;

/// How long a simulated participant waits for a task before giving up.
/// Generous: near the end of a run its peers may already have left.
const TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Chance that a simulated review accepts the program.
const ACCEPT_RATE: f64 = 0.5;

/// Run `participants` scripted clients against the server at `addr`; each
/// leaves after submitting its own program `rounds` times.
pub async fn run(addr: SocketAddr, participants: usize, rounds: u32) -> Result<()> {
    info!(%addr, participants, rounds, "starting simulated participants");

    let mut tasks = JoinSet::new();
    for _ in 0..participants {
        tasks.spawn(async move {
            if let Err(e) = participant(addr, rounds).await {
                warn!(error = %e, "simulated participant gave up");
            }
        });
    }
    while tasks.join_next().await.is_some() {}

    info!("simulation finished");
    Ok(())
}

async fn participant(addr: SocketAddr, rounds: u32) -> Result<()> {
    let mut client = ParticipantClient::connect(addr).await?.with_timeout(TASK_TIMEOUT);

    // identity arrives with the greeting task
    let greeting = client.recv_task().await?;
    let id: ParticipantId = greeting.program_id;
    info!(participant = id, "connected");

    let mut submitted = 0u32;
    let mut task = greeting;
    loop {
        // a verdict on our own program is the only point where we are not
        // owed a reply, so it is the only safe place to leave
        let done = submitted >= rounds;
        match task.status {
            ProgramStatus::Writing => {
                work().await;
                client.send_update(id, ProgramStatus::AwaitingReview).await?;
                submitted += 1;
            }
            ProgramStatus::Accepted if done => {
                info!(participant = id, submitted, "rounds done, leaving");
                client.disconnect().await?;
                return Ok(());
            }
            ProgramStatus::Accepted => {
                debug!(participant = id, "program accepted, starting the next one");
                client.send_update(id, ProgramStatus::Writing).await?;
                work().await;
                client.send_update(id, ProgramStatus::AwaitingReview).await?;
                submitted += 1;
            }
            ProgramStatus::Rejected if done => {
                info!(participant = id, submitted, "rounds done, abandoning the rejected program");
                client.disconnect().await?;
                return Ok(());
            }
            ProgramStatus::Rejected => {
                debug!(participant = id, "program rejected, reworking");
                work().await;
                client.send_update(id, ProgramStatus::AwaitingReview).await?;
                submitted += 1;
            }
            ProgramStatus::AwaitingReview => {
                // reviews are owed to peers even once our own rounds are done
                debug!(participant = id, program = task.program_id, "reviewing");
                work().await;
                let verdict = if rand::rng().random_bool(ACCEPT_RATE) {
                    ProgramStatus::Accepted
                } else {
                    ProgramStatus::Rejected
                };
                client.send_update(task.program_id, verdict).await?;
            }
            ProgramStatus::InReview | ProgramStatus::Fixing => {
                warn!(participant = id, ?task, "server handed out an unexpected task");
            }
        }

        task = client.recv_task().await?;
    }
}

/// Simulate a little thinking time so sessions genuinely interleave.
async fn work() {
    let millis = rand::rng().random_range(20..120);
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

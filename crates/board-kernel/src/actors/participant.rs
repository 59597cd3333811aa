//! Participant runner: one tokio task driving one piece through the protocol.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::sync::{watch, Barrier};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::actors::BoardActor;
use crate::config::TimingConfig;
use crate::coordinate::Coordinate;
use crate::error::ParticipantError;
use crate::messages::BoardTask;
use crate::piece::{Piece, PieceId, PieceKind};
use crate::policy::MovementPolicy;
use crate::sink::ChannelSink;
use crate::state_machine::{self, ParticipantInput, ParticipantStats, StepContext};

/// Outcome of one participant's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantReport {
    pub id: PieceId,
    pub kind: PieceKind,
    pub final_state: &'static str,
    /// Where the participant believes its piece ended; invalid once removed.
    pub final_position: Coordinate,
    #[serde(flatten)]
    pub stats: ParticipantStats,
}

/// An autonomous agent owning one piece.
pub struct Participant {
    piece: Piece,
    steps: Option<u32>,
    timing: TimingConfig,
    policy: Arc<dyn MovementPolicy>,
    rng: ChaCha8Rng,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("piece", &self.piece)
            .field("steps", &self.steps)
            .field("timing", &self.timing)
            .finish()
    }
}

impl Participant {
    /// A participant for a fresh piece of `kind`, moving at most `steps`
    /// times (`None` for no limit) with its own RNG seeded by `seed`.
    pub fn new(id: PieceId, kind: PieceKind, steps: Option<u32>, timing: TimingConfig, seed: u64) -> Self {
        Self {
            piece: Piece::new(id, kind),
            steps,
            timing,
            policy: kind.shared_policy(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Replace the kind's default policy.
    pub fn with_policy(mut self, policy: Arc<dyn MovementPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> PieceId {
        self.piece.id
    }

    /// Run until the piece reaches `Stop`.
    ///
    /// The participant subscribes before waiting on `barrier`, so no event for
    /// its piece is missed. Setting `stop` to true requests an orderly stop.
    pub async fn run(
        self,
        board: BoardActor,
        mut stop: watch::Receiver<bool>,
        barrier: Option<Arc<Barrier>>,
    ) -> Result<ParticipantReport, ParticipantError> {
        let Participant {
            piece,
            steps,
            timing,
            policy,
            rng,
        } = self;
        let id = piece.id;

        let (sink, mut inbox) = ChannelSink::channel(Some(id));
        board.add_subscriber(&sink);

        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        info!(piece = %id, steps = ?steps, "Participant started");

        let mut ctx = StepContext {
            piece,
            board_size: board.board_size(),
            remaining_steps: steps,
            policy,
            rng,
            stats: ParticipantStats::default(),
        };

        let opening = state_machine::start(&mut ctx);
        send_all(&board, &opening.requests).await;
        let mut state = opening.next;

        while !state.is_terminal() {
            // Events already delivered are handled before a stop, so cleanup
            // requests name the cell the piece actually holds.
            let input = if *stop.borrow() {
                match inbox.try_recv() {
                    Ok(event) => ParticipantInput::Event(event),
                    Err(_) => ParticipantInput::StopRequested,
                }
            } else {
                let period = state.wait_period(&timing, &mut ctx.rng);
                tokio::select! {
                    biased;
                    received = timeout(period, inbox.recv()) => match received {
                        Ok(Some(event)) => ParticipantInput::Event(event),
                        Ok(None) => ParticipantInput::StopRequested,
                        Err(_) => ParticipantInput::Timeout,
                    },
                    changed = stop.changed() => match changed {
                        Ok(()) if !*stop.borrow() => continue,
                        _ => ParticipantInput::StopRequested,
                    },
                }
            };

            let from = state.name();
            match state_machine::transition(state, input, &mut ctx) {
                Ok(step) => {
                    if from != step.next.name() {
                        debug!(piece = %id, from, to = step.next.name(), "State changed");
                    }
                    send_all(&board, &step.requests).await;
                    state = step.next;
                }
                Err(violation) => {
                    error!(piece = %id, error = %violation, "Protocol violation, aborting participant");
                    board.remove_subscriber(&sink);
                    return Err(violation);
                }
            }
        }

        board.remove_subscriber(&sink);

        info!(
            piece = %id,
            moves = ctx.stats.moves,
            waits = ctx.stats.waits,
            timeouts = ctx.stats.timeouts,
            cancellations = ctx.stats.cancellations,
            "Participant stopped"
        );

        Ok(ParticipantReport {
            id,
            kind: ctx.piece.kind,
            final_state: state.name(),
            final_position: ctx.piece.position,
            stats: ctx.stats,
        })
    }
}

async fn send_all(board: &BoardActor, requests: &[BoardTask]) {
    for task in requests {
        board.submit(*task).await;
    }
}

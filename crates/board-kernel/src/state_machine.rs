//! Participant protocol: states, inputs and the transition function.
//!
//! A participant drives one piece. It consumes one input at a time (a board
//! event for its piece, a timeout, or a stop request), updates its piece, and
//! decides which requests to send next. [`transition`] holds no I/O so the
//! protocol table can be exercised directly; the runner in
//! [`crate::actors::Participant`] supplies the inputs and sends the requests.

use std::sync::Arc;
use std::time::Duration;

use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::coordinate::Coordinate;
use crate::error::ParticipantError;
use crate::messages::{BoardEvent, BoardTask, RejectReason, TaskKind};
use crate::piece::Piece;
use crate::policy::MovementPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantState {
    /// A request is in flight; `pending` is what was sent.
    WaitForConfirm { pending: BoardTask },
    /// The piece rests on its cell until the next step is due.
    NextStep,
    /// The board queued the piece behind the occupant of `target`.
    /// `from` is [`Coordinate::INVALID`] for a queued placement.
    WaitForCell { from: Coordinate, target: Coordinate },
    Stop,
}

impl ParticipantState {
    pub fn name(&self) -> &'static str {
        match self {
            ParticipantState::WaitForConfirm { .. } => "WaitForConfirm",
            ParticipantState::NextStep => "NextStep",
            ParticipantState::WaitForCell { .. } => "WaitForCell",
            ParticipantState::Stop => "Stop",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ParticipantState::Stop)
    }

    /// How long to wait for an event in this state before a timeout.
    pub fn wait_period(&self, timing: &TimingConfig, rng: &mut ChaCha8Rng) -> Duration {
        match self {
            ParticipantState::WaitForConfirm { .. } => timing.confirm(),
            ParticipantState::NextStep => timing.next_step(rng),
            ParticipantState::WaitForCell { .. } => timing.wait_for_cell(),
            ParticipantState::Stop => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantInput {
    Event(BoardEvent),
    Timeout,
    StopRequested,
}

/// Result of one transition: the state to enter and the requests to send, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: ParticipantState,
    pub requests: Vec<BoardTask>,
}

impl Transition {
    fn to(next: ParticipantState) -> Self {
        Self {
            next,
            requests: Vec::new(),
        }
    }

    fn sending(next: ParticipantState, requests: Vec<BoardTask>) -> Self {
        Self { next, requests }
    }
}

/// Counters kept per participant for the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParticipantStats {
    pub moves: u32,
    pub waits: u32,
    pub timeouts: u32,
    pub cancellations: u32,
}

/// Everything a transition may read or update besides the state itself.
pub struct StepContext {
    pub piece: Piece,
    pub board_size: u8,
    /// Successful moves left before the participant retires its piece; `None` is unbounded.
    pub remaining_steps: Option<u32>,
    pub policy: Arc<dyn MovementPolicy>,
    pub rng: ChaCha8Rng,
    pub stats: ParticipantStats,
}

impl StepContext {
    fn propose_step(&mut self) -> Coordinate {
        self.policy
            .propose(self.piece.position, self.board_size, &mut self.rng)
    }

    fn propose_first(&mut self) -> Coordinate {
        self.policy.propose_first(self.board_size, &mut self.rng)
    }

    fn step_request(&mut self) -> BoardTask {
        let to = self.propose_step();
        BoardTask::move_to(self.piece.id, self.piece.position, to)
    }

    fn retire_request(&self) -> BoardTask {
        BoardTask::remove(self.piece.id, self.piece.position)
    }

    fn arrive(&mut self, at: Coordinate, moved: bool) {
        self.piece.position = at;
        if moved {
            self.stats.moves += 1;
            if let Some(left) = self.remaining_steps.as_mut() {
                *left = left.saturating_sub(1);
            }
        }
    }
}

/// Initial request and state: place the piece on a policy-chosen cell.
pub fn start(ctx: &mut StepContext) -> Transition {
    let to = ctx.propose_first();
    let place = BoardTask::place(ctx.piece.id, to);
    Transition::sending(
        ParticipantState::WaitForConfirm { pending: place },
        vec![place],
    )
}

/// Advance the protocol by one input.
///
/// Events for other pieces leave the state untouched. A rejection other
/// than `boardStopped` is a [`ParticipantError::ProtocolViolation`], except
/// the answer to a cancel whose wait was granted first.
pub fn transition(
    state: ParticipantState,
    input: ParticipantInput,
    ctx: &mut StepContext,
) -> Result<Transition, ParticipantError> {
    if let ParticipantInput::Event(event) = &input {
        if event.id() != ctx.piece.id {
            return Ok(Transition::to(state));
        }
    }

    match (state, input) {
        (ParticipantState::Stop, _) => Ok(Transition::to(ParticipantState::Stop)),

        (
            state,
            ParticipantInput::Event(BoardEvent::Reject {
                reason: RejectReason::BoardStopped,
                ..
            }),
        ) => {
            info!(piece = %ctx.piece.id, state = state.name(), "Board stopped");
            Ok(Transition::to(ParticipantState::Stop))
        }

        // A promotion can grant the cell while the cancel is queued; the
        // board then answers the cancel with waiterNotFound or idMismatch.
        (
            ParticipantState::WaitForConfirm { pending },
            ParticipantInput::Event(BoardEvent::Reject {
                reason: RejectReason::WaiterNotFound | RejectReason::IdMismatch,
                ..
            }),
        ) if cancel_overtaken(&pending, ctx) => {
            debug!(piece = %ctx.piece.id, cell = %ctx.piece.position, "Cell granted before the cancel");
            Ok(Transition::to(ParticipantState::NextStep))
        }

        (state, ParticipantInput::Event(BoardEvent::Reject { reason, .. })) => {
            Err(ParticipantError::ProtocolViolation {
                id: ctx.piece.id,
                state: state.name(),
                reason,
            })
        }

        (_, ParticipantInput::Event(BoardEvent::Removed { .. })) => {
            ctx.piece.position = Coordinate::INVALID;
            Ok(Transition::to(ParticipantState::Stop))
        }

        (ParticipantState::WaitForConfirm { pending }, input) => {
            Ok(on_wait_for_confirm(pending, input, ctx))
        }
        (ParticipantState::NextStep, input) => Ok(on_next_step(input, ctx)),
        (ParticipantState::WaitForCell { from, target }, input) => {
            Ok(on_wait_for_cell(from, target, input, ctx))
        }
    }
}

/// True when `pending` is a cancel whose wait was already granted.
fn cancel_overtaken(pending: &BoardTask, ctx: &StepContext) -> bool {
    pending.kind == TaskKind::CancelMove && ctx.piece.position == pending.to
}

fn on_wait_for_confirm(pending: BoardTask, input: ParticipantInput, ctx: &mut StepContext) -> Transition {
    let cancelling = pending.kind == TaskKind::CancelMove;
    match input {
        ParticipantInput::Timeout => {
            // The request is still queued on the board; resending it would be
            // answered with duplicateId/idMismatch.
            ctx.stats.timeouts += 1;
            warn!(piece = %ctx.piece.id, request = ?pending.kind, "Confirmation overdue, still waiting");
            Transition::to(ParticipantState::WaitForConfirm { pending })
        }
        // With a cancel in flight the grant is recorded, then the cancel's
        // rejection is still owed.
        ParticipantInput::Event(BoardEvent::Placed { to, .. }) => {
            ctx.arrive(to, false);
            if cancelling {
                Transition::to(ParticipantState::WaitForConfirm { pending })
            } else {
                Transition::to(ParticipantState::NextStep)
            }
        }
        ParticipantInput::Event(BoardEvent::Moved { to, .. }) => {
            ctx.arrive(to, true);
            if cancelling {
                Transition::to(ParticipantState::WaitForConfirm { pending })
            } else {
                Transition::to(ParticipantState::NextStep)
            }
        }
        ParticipantInput::Event(BoardEvent::WaitingForCell { from, to, .. }) => {
            ctx.stats.waits += 1;
            debug!(piece = %ctx.piece.id, cell = %to, "Waiting for cell");
            Transition::to(ParticipantState::WaitForCell { from, target: to })
        }
        ParticipantInput::Event(BoardEvent::CancelMoved { .. }) => {
            ctx.stats.cancellations += 1;
            let request = if ctx.piece.is_placed() {
                ctx.step_request()
            } else {
                let to = ctx.propose_first();
                BoardTask::place(ctx.piece.id, to)
            };
            Transition::sending(
                ParticipantState::WaitForConfirm { pending: request },
                vec![request],
            )
        }
        ParticipantInput::StopRequested => {
            Transition::sending(ParticipantState::Stop, withdraw_pending(&pending, ctx))
        }
        ParticipantInput::Event(_) => Transition::to(ParticipantState::WaitForConfirm { pending }),
    }
}

/// Cleanup for a stop that arrives while `pending` is unanswered.
///
/// The outcome of `pending` is unknown, so the requests cover every cell the
/// piece may end up on. Requests for the outcome that did not happen are
/// answered with a rejection the stopped participant no longer reads.
fn withdraw_pending(pending: &BoardTask, ctx: &StepContext) -> Vec<BoardTask> {
    let id = ctx.piece.id;
    match pending.kind {
        TaskKind::Remove => Vec::new(),
        TaskKind::Place if !ctx.piece.is_placed() => vec![
            BoardTask::cancel_move(id, Coordinate::INVALID, pending.to),
            BoardTask::remove(id, pending.to),
        ],
        TaskKind::Place => vec![ctx.retire_request()],
        TaskKind::Move | TaskKind::CancelMove => {
            let mut requests = Vec::with_capacity(2);
            if ctx.piece.is_placed() {
                requests.push(ctx.retire_request());
            }
            if pending.to != ctx.piece.position {
                requests.push(BoardTask::remove(id, pending.to));
            }
            requests
        }
    }
}

fn on_next_step(input: ParticipantInput, ctx: &mut StepContext) -> Transition {
    match input {
        ParticipantInput::Timeout => {
            let request = if ctx.remaining_steps == Some(0) {
                info!(piece = %ctx.piece.id, cell = %ctx.piece.position, "Step budget spent, retiring piece");
                ctx.retire_request()
            } else {
                ctx.step_request()
            };
            Transition::sending(
                ParticipantState::WaitForConfirm { pending: request },
                vec![request],
            )
        }
        ParticipantInput::StopRequested => {
            Transition::sending(ParticipantState::Stop, vec![ctx.retire_request()])
        }
        ParticipantInput::Event(event) => {
            warn!(piece = %ctx.piece.id, event = ?event, "Unexpected event between steps");
            Transition::to(ParticipantState::NextStep)
        }
    }
}

fn on_wait_for_cell(
    from: Coordinate,
    target: Coordinate,
    input: ParticipantInput,
    ctx: &mut StepContext,
) -> Transition {
    let waiting = ParticipantState::WaitForCell { from, target };
    match input {
        ParticipantInput::Timeout => {
            // Give up the wait and pick another cell once the board confirms.
            ctx.stats.timeouts += 1;
            debug!(piece = %ctx.piece.id, cell = %target, "Cell still contended, cancelling wait");
            let cancel = BoardTask::cancel_move(ctx.piece.id, from, target);
            Transition::sending(ParticipantState::WaitForConfirm { pending: cancel }, vec![cancel])
        }
        ParticipantInput::Event(BoardEvent::Placed { to, .. }) => {
            ctx.arrive(to, false);
            Transition::to(ParticipantState::NextStep)
        }
        ParticipantInput::Event(BoardEvent::Moved { to, .. }) => {
            ctx.arrive(to, true);
            Transition::to(ParticipantState::NextStep)
        }
        ParticipantInput::Event(BoardEvent::WaitingForCell { .. }) => Transition::to(waiting),
        ParticipantInput::StopRequested => {
            // The last remove catches a grant that overtakes the cancel.
            let id = ctx.piece.id;
            let requests = if from.is_invalid() {
                vec![
                    BoardTask::cancel_move(id, Coordinate::INVALID, target),
                    BoardTask::remove(id, target),
                ]
            } else {
                vec![
                    BoardTask::cancel_move(id, from, target),
                    BoardTask::remove(id, from),
                    BoardTask::remove(id, target),
                ]
            };
            Transition::sending(ParticipantState::Stop, requests)
        }
        ParticipantInput::Event(event) => {
            warn!(piece = %ctx.piece.id, event = ?event, "Unexpected event while waiting for cell");
            Transition::to(waiting)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{PieceId, PieceKind};
    use rand::{RngCore, SeedableRng};

    const ME: PieceId = PieceId(7);
    const OTHER: PieceId = PieceId(8);

    /// Always starts at `first` and always steps to `step`.
    struct FixedPolicy {
        first: Coordinate,
        step: Coordinate,
    }

    impl MovementPolicy for FixedPolicy {
        fn validate(&self, current: Coordinate, candidate: Coordinate, board_size: u8) -> bool {
            candidate.in_bounds(board_size) && current != candidate
        }

        fn propose(&self, _current: Coordinate, _board_size: u8, _rng: &mut dyn RngCore) -> Coordinate {
            self.step
        }

        fn propose_first(&self, _board_size: u8, _rng: &mut dyn RngCore) -> Coordinate {
            self.first
        }
    }

    fn at(x: i32, y: i32) -> Coordinate {
        Coordinate::new(x, y)
    }

    fn context(steps: Option<u32>) -> StepContext {
        StepContext {
            piece: Piece::new(ME, PieceKind::Rook),
            board_size: 8,
            remaining_steps: steps,
            policy: Arc::new(FixedPolicy {
                first: at(2, 2),
                step: at(2, 6),
            }),
            rng: ChaCha8Rng::seed_from_u64(0),
            stats: ParticipantStats::default(),
        }
    }

    fn placed_context(steps: Option<u32>) -> StepContext {
        let mut ctx = context(steps);
        ctx.piece.position = at(2, 2);
        ctx
    }

    fn event(e: BoardEvent) -> ParticipantInput {
        ParticipantInput::Event(e)
    }

    fn step(state: ParticipantState, input: ParticipantInput, ctx: &mut StepContext) -> Transition {
        transition(state, input, ctx).expect("transition should succeed")
    }

    #[test]
    fn start_places_on_proposed_cell() {
        let mut ctx = context(None);
        let t = start(&mut ctx);
        let place = BoardTask::place(ME, at(2, 2));
        assert_eq!(t.requests, vec![place]);
        assert_eq!(t.next, ParticipantState::WaitForConfirm { pending: place });
    }

    #[test]
    fn confirmation_records_position() {
        let mut ctx = context(Some(3));
        let pending = BoardTask::place(ME, at(2, 2));
        let t = step(
            ParticipantState::WaitForConfirm { pending },
            event(BoardEvent::Placed { id: ME, to: at(2, 2) }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::NextStep);
        assert!(t.requests.is_empty());
        assert_eq!(ctx.piece.position, at(2, 2));
        assert_eq!(ctx.remaining_steps, Some(3));

        let pending = BoardTask::move_to(ME, at(2, 2), at(2, 6));
        let t = step(
            ParticipantState::WaitForConfirm { pending },
            event(BoardEvent::Moved { id: ME, from: at(2, 2), to: at(2, 6) }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::NextStep);
        assert_eq!(ctx.piece.position, at(2, 6));
        assert_eq!(ctx.remaining_steps, Some(2));
        assert_eq!(ctx.stats.moves, 1);
    }

    #[test]
    fn confirm_timeout_keeps_waiting_without_resending() {
        let mut ctx = placed_context(None);
        let pending = BoardTask::move_to(ME, at(2, 2), at(2, 6));
        let t = step(
            ParticipantState::WaitForConfirm { pending },
            ParticipantInput::Timeout,
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::WaitForConfirm { pending });
        assert!(t.requests.is_empty());
        assert_eq!(ctx.stats.timeouts, 1);
    }

    #[test]
    fn waiting_notice_enters_wait_for_cell() {
        let mut ctx = placed_context(None);
        let pending = BoardTask::move_to(ME, at(2, 2), at(2, 6));
        let t = step(
            ParticipantState::WaitForConfirm { pending },
            event(BoardEvent::WaitingForCell { id: ME, from: at(2, 2), to: at(2, 6) }),
            &mut ctx,
        );
        assert_eq!(
            t.next,
            ParticipantState::WaitForCell { from: at(2, 2), target: at(2, 6) }
        );
        assert!(t.requests.is_empty());
    }

    #[test]
    fn cancel_confirmation_issues_fresh_step() {
        let mut ctx = placed_context(None);
        let pending = BoardTask::cancel_move(ME, at(2, 2), at(2, 6));
        let t = step(
            ParticipantState::WaitForConfirm { pending },
            event(BoardEvent::CancelMoved { id: ME, from: at(2, 2), to: at(2, 6) }),
            &mut ctx,
        );
        let fresh = BoardTask::move_to(ME, at(2, 2), at(2, 6));
        assert_eq!(t.requests, vec![fresh]);
        assert_eq!(t.next, ParticipantState::WaitForConfirm { pending: fresh });
    }

    #[test]
    fn next_step_timeout_moves() {
        let mut ctx = placed_context(Some(5));
        let t = step(ParticipantState::NextStep, ParticipantInput::Timeout, &mut ctx);
        let request = BoardTask::move_to(ME, at(2, 2), at(2, 6));
        assert_eq!(t.requests, vec![request]);
        assert_eq!(t.next, ParticipantState::WaitForConfirm { pending: request });
    }

    #[test]
    fn spent_budget_retires_through_removal() {
        let mut ctx = placed_context(Some(0));
        let t = step(ParticipantState::NextStep, ParticipantInput::Timeout, &mut ctx);
        let remove = BoardTask::remove(ME, at(2, 2));
        assert_eq!(t.requests, vec![remove]);

        let t = step(
            t.next,
            event(BoardEvent::Removed { id: ME, from: at(2, 2) }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::Stop);
        assert!(!ctx.piece.is_placed());
    }

    #[test]
    fn wait_for_cell_timeout_cancels_the_wait() {
        let mut ctx = placed_context(None);
        let waiting = ParticipantState::WaitForCell { from: at(2, 2), target: at(2, 6) };
        let t = step(
            waiting.clone(),
            event(BoardEvent::WaitingForCell { id: ME, from: at(2, 2), to: at(2, 6) }),
            &mut ctx,
        );
        assert_eq!(t.next, waiting);

        let t = step(waiting, ParticipantInput::Timeout, &mut ctx);
        let cancel = BoardTask::cancel_move(ME, at(2, 2), at(2, 6));
        assert_eq!(t.requests, vec![cancel]);
        assert_eq!(t.next, ParticipantState::WaitForConfirm { pending: cancel });
        assert_eq!(ctx.stats.timeouts, 1);

        // The board confirms; a fresh step is proposed from the same cell.
        let t = step(
            t.next,
            event(BoardEvent::CancelMoved { id: ME, from: at(2, 2), to: at(2, 6) }),
            &mut ctx,
        );
        let fresh = BoardTask::move_to(ME, at(2, 2), at(2, 6));
        assert_eq!(t.requests, vec![fresh]);
        assert_eq!(t.next, ParticipantState::WaitForConfirm { pending: fresh });
        assert_eq!(ctx.stats.cancellations, 1);
    }

    #[test]
    fn queued_placement_timeout_cancels_and_places_again() {
        let mut ctx = context(None);
        let waiting = ParticipantState::WaitForCell { from: Coordinate::INVALID, target: at(2, 2) };
        let t = step(waiting, ParticipantInput::Timeout, &mut ctx);
        let cancel = BoardTask::cancel_move(ME, Coordinate::INVALID, at(2, 2));
        assert_eq!(t.requests, vec![cancel]);

        let t = step(
            t.next,
            event(BoardEvent::CancelMoved { id: ME, from: Coordinate::INVALID, to: at(2, 2) }),
            &mut ctx,
        );
        assert_eq!(t.requests, vec![BoardTask::place(ME, at(2, 2))]);
    }

    #[test]
    fn grant_overtaking_the_cancel_is_kept() {
        let mut ctx = placed_context(Some(3));
        let cancel = BoardTask::cancel_move(ME, at(2, 2), at(2, 6));
        let cancelling = ParticipantState::WaitForConfirm { pending: cancel };

        let t = step(
            cancelling.clone(),
            event(BoardEvent::Moved { id: ME, from: at(2, 2), to: at(2, 6) }),
            &mut ctx,
        );
        assert_eq!(t.next, cancelling);
        assert!(t.requests.is_empty());
        assert_eq!(ctx.piece.position, at(2, 6));
        assert_eq!(ctx.stats.moves, 1);
        assert_eq!(ctx.remaining_steps, Some(2));

        // The origin is no longer held, so the board answers idMismatch.
        let t = step(
            t.next,
            event(BoardEvent::Reject { id: ME, reason: RejectReason::IdMismatch }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::NextStep);
        assert!(t.requests.is_empty());
    }

    #[test]
    fn grant_overtaking_a_placement_cancel_is_kept() {
        let mut ctx = context(None);
        let cancel = BoardTask::cancel_move(ME, Coordinate::INVALID, at(2, 2));
        let t = step(
            ParticipantState::WaitForConfirm { pending: cancel },
            event(BoardEvent::Placed { id: ME, to: at(2, 2) }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::WaitForConfirm { pending: cancel });

        let t = step(
            t.next,
            event(BoardEvent::Reject { id: ME, reason: RejectReason::WaiterNotFound }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::NextStep);
        assert_eq!(ctx.piece.position, at(2, 2));
    }

    #[test]
    fn cancel_rejected_without_a_grant_is_a_violation() {
        let mut ctx = placed_context(None);
        let result = transition(
            ParticipantState::WaitForConfirm {
                pending: BoardTask::cancel_move(ME, at(2, 2), at(2, 6)),
            },
            event(BoardEvent::Reject { id: ME, reason: RejectReason::WaiterNotFound }),
            &mut ctx,
        );
        assert_eq!(
            result,
            Err(ParticipantError::ProtocolViolation {
                id: ME,
                state: "WaitForConfirm",
                reason: RejectReason::WaiterNotFound,
            })
        );
    }

    #[test]
    fn granted_cell_leads_to_next_step() {
        let mut ctx = placed_context(Some(2));
        let waiting = ParticipantState::WaitForCell { from: at(2, 2), target: at(2, 6) };
        let t = step(
            waiting,
            event(BoardEvent::Moved { id: ME, from: at(2, 2), to: at(2, 6) }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::NextStep);
        assert_eq!(ctx.piece.position, at(2, 6));
        assert_eq!(ctx.remaining_steps, Some(1));
    }

    #[test]
    fn board_stopped_ends_every_live_state() {
        let states = [
            ParticipantState::WaitForConfirm { pending: BoardTask::place(ME, at(2, 2)) },
            ParticipantState::NextStep,
            ParticipantState::WaitForCell { from: at(2, 2), target: at(2, 6) },
        ];
        for state in states {
            let mut ctx = placed_context(None);
            let t = step(
                state,
                event(BoardEvent::Reject { id: ME, reason: RejectReason::BoardStopped }),
                &mut ctx,
            );
            assert_eq!(t.next, ParticipantState::Stop);
            assert!(t.requests.is_empty());
        }
    }

    #[test]
    fn unexpected_reject_is_a_protocol_violation() {
        let mut ctx = placed_context(None);
        let result = transition(
            ParticipantState::WaitForConfirm {
                pending: BoardTask::move_to(ME, at(2, 2), at(2, 6)),
            },
            event(BoardEvent::Reject { id: ME, reason: RejectReason::IdMismatch }),
            &mut ctx,
        );
        assert_eq!(
            result,
            Err(ParticipantError::ProtocolViolation {
                id: ME,
                state: "WaitForConfirm",
                reason: RejectReason::IdMismatch,
            })
        );
    }

    #[test]
    fn stop_request_cleans_up_per_state() {
        let mut ctx = placed_context(None);
        let t = step(ParticipantState::NextStep, ParticipantInput::StopRequested, &mut ctx);
        assert_eq!(t.next, ParticipantState::Stop);
        assert_eq!(t.requests, vec![BoardTask::remove(ME, at(2, 2))]);

        let t = step(
            ParticipantState::WaitForCell { from: at(2, 2), target: at(2, 6) },
            ParticipantInput::StopRequested,
            &mut ctx,
        );
        assert_eq!(
            t.requests,
            vec![
                BoardTask::cancel_move(ME, at(2, 2), at(2, 6)),
                BoardTask::remove(ME, at(2, 2)),
                BoardTask::remove(ME, at(2, 6)),
            ]
        );

        let t = step(
            ParticipantState::WaitForConfirm {
                pending: BoardTask::move_to(ME, at(2, 2), at(2, 6)),
            },
            ParticipantInput::StopRequested,
            &mut ctx,
        );
        assert_eq!(
            t.requests,
            vec![BoardTask::remove(ME, at(2, 2)), BoardTask::remove(ME, at(2, 6))]
        );

        let t = step(
            ParticipantState::WaitForConfirm { pending: BoardTask::remove(ME, at(2, 2)) },
            ParticipantInput::StopRequested,
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::Stop);
        assert!(t.requests.is_empty());
    }

    #[test]
    fn stop_while_placement_queued_withdraws_it() {
        let mut ctx = context(None);
        let t = step(
            ParticipantState::WaitForCell { from: Coordinate::INVALID, target: at(2, 2) },
            ParticipantInput::StopRequested,
            &mut ctx,
        );
        assert_eq!(
            t.requests,
            vec![
                BoardTask::cancel_move(ME, Coordinate::INVALID, at(2, 2)),
                BoardTask::remove(ME, at(2, 2)),
            ]
        );
    }

    #[test]
    fn stop_while_placement_unanswered_withdraws_both_outcomes() {
        let mut ctx = context(None);
        let t = step(
            ParticipantState::WaitForConfirm { pending: BoardTask::place(ME, at(2, 2)) },
            ParticipantInput::StopRequested,
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::Stop);
        assert_eq!(
            t.requests,
            vec![
                BoardTask::cancel_move(ME, Coordinate::INVALID, at(2, 2)),
                BoardTask::remove(ME, at(2, 2)),
            ]
        );
    }

    #[test]
    fn foreign_events_are_ignored() {
        let mut ctx = placed_context(None);
        let t = step(
            ParticipantState::NextStep,
            event(BoardEvent::Reject { id: OTHER, reason: RejectReason::IdMismatch }),
            &mut ctx,
        );
        assert_eq!(t.next, ParticipantState::NextStep);
        assert!(t.requests.is_empty());
    }

    #[test]
    fn stop_is_terminal() {
        let mut ctx = placed_context(None);
        for input in [
            ParticipantInput::Timeout,
            ParticipantInput::StopRequested,
            event(BoardEvent::Placed { id: ME, to: at(0, 0) }),
        ] {
            let t = step(ParticipantState::Stop, input, &mut ctx);
            assert_eq!(t.next, ParticipantState::Stop);
            assert!(t.requests.is_empty());
        }
        assert_eq!(
            ParticipantState::Stop.wait_period(&TimingConfig::default(), &mut ctx.rng),
            Duration::ZERO
        );
    }
}

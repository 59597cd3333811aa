//! Message types exchanged with the board actor.
//!
//! Requests travel into the board as [`BoardTask`] values through the actor's
//! mailbox; outcomes travel out to every subscriber as [`BoardEvent`] values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::piece::PieceId;

/// Which board operation a task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Place,
    Move,
    CancelMove,
    Remove,
}

/// A unit of work for the board actor.
///
/// Created by one of the public request methods, consumed exactly once by the
/// arbitration handler, then dropped. Coordinates that do not apply to the
/// kind are [`Coordinate::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardTask {
    pub kind: TaskKind,
    pub id: PieceId,
    pub from: Coordinate,
    pub to: Coordinate,
}

impl BoardTask {
    pub fn place(id: PieceId, to: Coordinate) -> Self {
        Self {
            kind: TaskKind::Place,
            id,
            from: Coordinate::INVALID,
            to,
        }
    }

    pub fn move_to(id: PieceId, from: Coordinate, to: Coordinate) -> Self {
        Self {
            kind: TaskKind::Move,
            id,
            from,
            to,
        }
    }

    pub fn cancel_move(id: PieceId, from: Coordinate, to: Coordinate) -> Self {
        Self {
            kind: TaskKind::CancelMove,
            id,
            from,
            to,
        }
    }

    pub fn remove(id: PieceId, from: Coordinate) -> Self {
        Self {
            kind: TaskKind::Remove,
            id,
            from,
            to: Coordinate::INVALID,
        }
    }
}

/// Halt marker sent once by [`BoardActor::stop`](crate::actors::BoardActor::stop).
///
/// Processed in mailbox order: every task ahead of it has already been
/// rejected by the time the wait queues are released.
#[derive(Debug, Clone)]
pub struct HaltBoard;

/// Marker sent by [`BoardActor::settle`](crate::actors::BoardActor::settle).
///
/// Processed in mailbox order: every task ahead of it has been arbitrated
/// when it is acknowledged.
#[derive(Debug, Clone)]
pub struct SettleBoard;

/// Why the board refused a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    BoardStopped,
    IncorrectCoordinate,
    IdMismatch,
    IncorrectId,
    DuplicateId,
    WaiterNotFound,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::BoardStopped => "boardStopped",
            RejectReason::IncorrectCoordinate => "incorrectCoordinate",
            RejectReason::IdMismatch => "idMismatch",
            RejectReason::IncorrectId => "incorrectId",
            RejectReason::DuplicateId => "duplicateId",
            RejectReason::WaiterNotFound => "waiterNotFound",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one task, broadcast by value to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    Placed {
        id: PieceId,
        to: Coordinate,
    },
    Moved {
        id: PieceId,
        from: Coordinate,
        to: Coordinate,
    },
    CancelMoved {
        id: PieceId,
        from: Coordinate,
        to: Coordinate,
    },
    Removed {
        id: PieceId,
        from: Coordinate,
    },
    /// `from` is [`Coordinate::INVALID`] when the waiter is a pending placement.
    WaitingForCell {
        id: PieceId,
        from: Coordinate,
        to: Coordinate,
    },
    Reject {
        id: PieceId,
        reason: RejectReason,
    },
}

impl BoardEvent {
    /// The piece this event is about.
    pub fn id(&self) -> PieceId {
        match *self {
            BoardEvent::Placed { id, .. }
            | BoardEvent::Moved { id, .. }
            | BoardEvent::CancelMoved { id, .. }
            | BoardEvent::Removed { id, .. }
            | BoardEvent::WaitingForCell { id, .. }
            | BoardEvent::Reject { id, .. } => id,
        }
    }

    pub(crate) fn reject(id: PieceId, reason: RejectReason) -> Self {
        BoardEvent::Reject { id, reason }
    }
}

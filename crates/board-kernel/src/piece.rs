//! Piece identity: a stable id, a kind tag and the piece's current cell.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

/// Numeric identity of a piece. `0` is reserved as [`PieceId::EMPTY`] and
/// marks an unoccupied cell; it is never handed to a real piece.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PieceId(pub u32);

impl PieceId {
    pub const EMPTY: PieceId = PieceId(0);

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out piece ids in increasing order, starting at 1.
#[derive(Debug, Default)]
pub struct PieceIdAllocator {
    last: u32,
}

impl PieceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> PieceId {
        self.last += 1;
        PieceId(self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    Rook,
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceKind::Rook => f.write_str("rook"),
        }
    }
}

/// A piece as seen by its owning participant.
///
/// `position` is only written by that participant, in response to events it
/// received for its own id. It is [`Coordinate::INVALID`] while the piece is
/// off the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub position: Coordinate,
}

impl Piece {
    pub fn new(id: PieceId, kind: PieceKind) -> Self {
        Self {
            id,
            kind,
            position: Coordinate::INVALID,
        }
    }

    pub fn is_placed(&self) -> bool {
        !self.position.is_invalid()
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] {}", self.kind, self.id, self.position)
    }
}

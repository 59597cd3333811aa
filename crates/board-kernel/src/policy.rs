//! Movement policies: propose and validate destinations for a piece.
//!
//! Policies are stateless; randomness is supplied by the caller so that each
//! participant can drive its own seeded generator.

use std::sync::Arc;

use rand::{Rng, RngCore};

use crate::coordinate::{Coordinate, MIN_BOARD_SIZE};
use crate::piece::PieceKind;

/// Candidate generation and validation for one kind of piece.
pub trait MovementPolicy: Send + Sync {
    /// True iff `candidate` is a legal destination from `current`.
    fn validate(&self, current: Coordinate, candidate: Coordinate, board_size: u8) -> bool;

    /// Propose a destination from `current`. Satisfies [`validate`](Self::validate),
    /// or is [`Coordinate::INVALID`] when no legal destination exists.
    fn propose(&self, current: Coordinate, board_size: u8, rng: &mut dyn RngCore) -> Coordinate;

    /// Propose a starting cell for a piece that is not on the board yet.
    /// [`Coordinate::INVALID`] on an empty board.
    fn propose_first(&self, board_size: u8, rng: &mut dyn RngCore) -> Coordinate {
        if board_size == 0 {
            return Coordinate::INVALID;
        }
        let size = i32::from(board_size);
        Coordinate::new(rng.random_range(0..size), rng.random_range(0..size))
    }
}

/// Orthogonal single-line movement: change exactly one axis by a non-zero offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct RookPolicy;

impl MovementPolicy for RookPolicy {
    fn validate(&self, current: Coordinate, candidate: Coordinate, board_size: u8) -> bool {
        candidate.in_bounds(board_size) && current.is_orthogonal_to(candidate)
    }

    fn propose(&self, current: Coordinate, board_size: u8, rng: &mut dyn RngCore) -> Coordinate {
        if board_size < MIN_BOARD_SIZE || !current.in_bounds(board_size) {
            return Coordinate::INVALID;
        }
        let max = i32::from(board_size) - 1;
        let along_x = rng.random_bool(0.5);
        let origin = if along_x { current.x } else { current.y };

        // Offsets span the whole file/rank; zero would be a null move.
        let delta = loop {
            let delta = rng.random_range(-origin..=max - origin);
            if delta != 0 {
                break delta;
            }
        };

        if along_x {
            Coordinate::new(current.x + delta, current.y)
        } else {
            Coordinate::new(current.x, current.y + delta)
        }
    }
}

impl PieceKind {
    pub fn policy(self) -> &'static dyn MovementPolicy {
        match self {
            PieceKind::Rook => &RookPolicy,
        }
    }

    /// Owned handle to the kind's policy, for participants that keep one.
    pub fn shared_policy(self) -> Arc<dyn MovementPolicy> {
        match self {
            PieceKind::Rook => Arc::new(RookPolicy),
        }
    }
}

//! Errors surfaced by the board and its participants.

use thiserror::Error;

use crate::messages::RejectReason;
use crate::piece::PieceId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParticipantError {
    /// The board refused a request that correct bookkeeping never produces.
    /// The participant's view of its piece and the board have diverged.
    #[error("piece {id} desynchronized from the board in state {state}: rejected with {reason}")]
    ProtocolViolation {
        id: PieceId,
        state: &'static str,
        reason: RejectReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board size {size} is too small: a piece needs at least a {min}x{min} board to move")]
    TooSmall { size: u8, min: u8 },
}

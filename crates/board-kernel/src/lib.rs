//! Board kernel: concurrent pieces contending for cells of a shared board.
//!
//! A [`BoardActor`] owns the grid and arbitrates placement, movement and
//! removal requests one at a time, queueing contenders for an occupied cell
//! in FIFO order and granting the cell when it frees up. Every outcome is
//! broadcast as a [`BoardEvent`] to registered [`EventSink`]s. Each piece is
//! driven by a [`Participant`] running the protocol in [`state_machine`].

pub mod actors;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod grid;
pub mod messages;
pub mod piece;
pub mod policy;
pub mod sink;
pub mod state_machine;

pub use actors::{BoardActor, BoardActorState, Participant, ParticipantReport};
pub use config::TimingConfig;
pub use coordinate::{Coordinate, MIN_BOARD_SIZE};
pub use error::{BoardError, ParticipantError};
pub use grid::{BoardSnapshot, Grid, WaitEntry};
pub use messages::{BoardEvent, BoardTask, HaltBoard, RejectReason, SettleBoard, TaskKind};
pub use piece::{Piece, PieceId, PieceIdAllocator, PieceKind};
pub use policy::{MovementPolicy, RookPolicy};
pub use sink::{ChannelSink, EventSink, Subscribers};
pub use state_machine::{ParticipantInput, ParticipantState, ParticipantStats, Transition};

//! Acton-reactive board actor and the tokio participants that drive it.
//!
//! ```text
//! Participant (tokio task, one per piece)
//!   ├─ place/move/cancelMove/remove → BoardActor mailbox (BoardTask)
//!   │     └─ mutate_on::<BoardTask>: Grid::apply under the grid lock
//!   │           └─ events → Subscribers (lock released, registration order)
//!   │                 ├─ ChannelSink → owning participant's inbox
//!   │                 └─ other sinks (event log, tests)
//!   └─ inbox / timeout / stop signal → state_machine::transition
//!
//! settle() → SettleBoard → acknowledged once every earlier task is applied
//! stop() → HaltBoard → release_waiters → Reject(boardStopped) to every waiter
//! ```
//!
//! The mailbox is the only path to the grid, so tasks are arbitrated strictly
//! one at a time in arrival order.

mod board_actor;
mod participant;

pub use board_actor::{BoardActor, BoardActorState};
pub use participant::{Participant, ParticipantReport};

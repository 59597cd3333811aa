//! BoardActor: the single writer of the grid.
//!
//! Every request becomes a [`BoardTask`] sent to this actor's mailbox, and a
//! single `mutate_on` handler applies tasks one at a time in arrival order.
//! The grid lock is held only while a task is applied (or a snapshot taken);
//! the resulting events are fanned out to subscribers after it is released.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use acton_reactive::prelude::*;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::coordinate::{Coordinate, MIN_BOARD_SIZE};
use crate::error::BoardError;
use crate::grid::{BoardSnapshot, Grid};
use crate::messages::{BoardEvent, BoardTask, HaltBoard, RejectReason, SettleBoard};
use crate::piece::PieceId;
use crate::sink::{EventSink, Subscribers};

/// Actor state for the board.
///
/// Everything is shared with the [`BoardActor`] facade so that snapshots,
/// subscriber changes and the stop flag never need a mailbox round trip.
#[derive(Default, Clone)]
pub struct BoardActorState {
    pub grid: Arc<Mutex<Grid>>,
    pub subscribers: Subscribers,
    pub stopped: Arc<AtomicBool>,
    /// Signalled once the halt has released every waiter.
    pub halted: Arc<Notify>,
    /// Signalled once per processed settle marker.
    pub settled: Arc<Notify>,
}

impl std::fmt::Debug for BoardActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self
            .grid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .size();
        f.debug_struct("BoardActorState")
            .field("size", &size)
            .field("subscribers", &self.subscribers)
            .field("stopped", &self.stopped.load(Ordering::SeqCst))
            .finish()
    }
}

/// Handle to a running board.
///
/// Cheap to clone; all clones drive the same board. Requests are
/// fire-and-forget: outcomes arrive only as events at subscribers.
#[derive(Clone)]
pub struct BoardActor {
    handle: ActorHandle,
    size: u8,
    state: BoardActorState,
}

impl std::fmt::Debug for BoardActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardActor")
            .field("size", &self.size)
            .field("state", &self.state)
            .finish()
    }
}

impl BoardActor {
    /// Spawn a board of `size` x `size` empty cells in the given runtime.
    ///
    /// Boards smaller than [`MIN_BOARD_SIZE`] are refused.
    pub async fn start(runtime: &mut ActorRuntime, size: u8) -> Result<Self, BoardError> {
        if size < MIN_BOARD_SIZE {
            return Err(BoardError::TooSmall {
                size,
                min: MIN_BOARD_SIZE,
            });
        }
        let mut actor = runtime.new_actor_with_name::<BoardActorState>(format!("Board:{size}x{size}"));

        let state = BoardActorState {
            grid: Arc::new(Mutex::new(Grid::new(size))),
            ..Default::default()
        };
        actor.model = state.clone();

        configure_board_actor(&mut actor);

        let handle = actor.start().await;
        info!(size, "Board started");

        Ok(Self {
            handle,
            size,
            state,
        })
    }

    pub fn board_size(&self) -> u8 {
        self.size
    }

    pub fn handle(&self) -> &ActorHandle {
        &self.handle
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }

    /// Request placement of `id` on `to`.
    pub async fn place_figure(&self, id: PieceId, to: Coordinate) {
        self.submit(BoardTask::place(id, to)).await;
    }

    /// Request a move of `id` from `from` to `to`.
    pub async fn move_figure(&self, id: PieceId, from: Coordinate, to: Coordinate) {
        self.submit(BoardTask::move_to(id, from, to)).await;
    }

    /// Withdraw the wait of `id` on `to`. `from` is [`Coordinate::INVALID`]
    /// to withdraw a queued placement.
    pub async fn cancel_move_figure(&self, id: PieceId, from: Coordinate, to: Coordinate) {
        self.submit(BoardTask::cancel_move(id, from, to)).await;
    }

    /// Request removal of `id` from `from`.
    pub async fn remove_figure(&self, id: PieceId, from: Coordinate) {
        self.submit(BoardTask::remove(id, from)).await;
    }

    /// Enqueue an already-built task.
    ///
    /// After [`stop`](Self::stop) the task is not enqueued; the caller's
    /// `boardStopped` rejection is published directly.
    pub async fn submit(&self, task: BoardTask) {
        if self.is_stopped() {
            self.state
                .subscribers
                .publish(&[BoardEvent::reject(task.id, RejectReason::BoardStopped)]);
            return;
        }
        self.handle.send(task).await;
    }

    /// Wait until every task submitted before this call has been arbitrated.
    ///
    /// Returns at once on a stopped board.
    pub async fn settle(&self) {
        if self.is_stopped() {
            return;
        }
        let settled = self.state.settled.notified();
        self.handle.send(SettleBoard).await;
        settled.await;
    }

    /// Stop accepting work and release all waiters with `boardStopped`.
    ///
    /// Tasks already in the mailbox are rejected as they come up. Idempotent:
    /// only the first call sends the halt, and only it waits for the release.
    pub async fn stop(&self) {
        if self.state.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(size = self.size, "Stopping board");
        let halted = self.state.halted.notified();
        self.handle.send(HaltBoard).await;
        halted.await;
    }

    pub fn add_subscriber(&self, sink: &Arc<dyn EventSink>) {
        self.state.subscribers.add(sink);
    }

    /// Unregister `sink`; false if it was not registered.
    pub fn remove_subscriber(&self, sink: &Arc<dyn EventSink>) -> bool {
        self.state.subscribers.remove(sink)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.len()
    }

    /// Consistent copy of the grid, taken under the grid lock.
    pub fn snapshot(&self) -> BoardSnapshot {
        self.state
            .grid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }
}

/// Arbitrate one task against the grid. A panic leaves the grid as it was.
fn arbitrate(grid: &Mutex<Grid>, task: &BoardTask) -> Vec<BoardEvent> {
    let mut grid = grid.lock().unwrap_or_else(PoisonError::into_inner);
    let backup = grid.clone();
    match catch_unwind(AssertUnwindSafe(|| grid.apply(task))) {
        Ok(events) => events,
        Err(_) => {
            *grid = backup;
            error!(piece = %task.id, task = ?task, "Arbitration panicked; grid restored");
            Vec::new()
        }
    }
}

/// Configure message handlers for the BoardActor.
fn configure_board_actor(actor: &mut ManagedActor<Idle, BoardActorState>) {
    actor.mutate_on::<BoardTask>(|actor, context| {
        let task = *context.message();

        let events = if actor.model.stopped.load(Ordering::SeqCst) {
            vec![BoardEvent::reject(task.id, RejectReason::BoardStopped)]
        } else {
            arbitrate(&actor.model.grid, &task)
        };

        debug!(piece = %task.id, kind = ?task.kind, events = events.len(), "Task applied");
        actor.model.subscribers.publish(&events);

        Reply::ready()
    });

    actor.mutate_on::<HaltBoard>(|actor, _context| {
        let released = actor
            .model
            .grid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release_waiters();

        info!(released = released.len(), "Board halted, waiters released");
        actor.model.subscribers.publish(&released);
        actor.model.halted.notify_one();

        Reply::ready()
    });

    actor.mutate_on::<SettleBoard>(|actor, _context| {
        actor.model.settled.notify_one();
        Reply::ready()
    });
}

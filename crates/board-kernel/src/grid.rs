//! The ownership table: cells, their FIFO wait queues and the live-id set.
//!
//! [`Grid::apply`] is the whole arbitration algorithm. It is synchronous and
//! owns no locks; the board actor guarantees that only one task is applied at
//! a time and publishes the returned events after releasing the grid.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, trace};

use crate::coordinate::Coordinate;
use crate::messages::{BoardEvent, BoardTask, RejectReason, TaskKind};
use crate::piece::PieceId;

/// A queued request for a contended cell.
///
/// `origin` is [`Coordinate::INVALID`] for a pending placement, otherwise the
/// cell the requester currently holds and will vacate when granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitEntry {
    pub id: PieceId,
    pub origin: Coordinate,
}

#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub occupant: PieceId,
    pub waiters: VecDeque<WaitEntry>,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.occupant.is_empty()
    }
}

/// Square board of cells plus the ids with an active placement on it.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    size: u8,
    cells: Vec<Cell>,
    live: HashSet<PieceId>,
}

/// Point-in-time copy of the board for reporting and assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    pub size: u8,
    /// Occupied cells in row-major order.
    pub occupants: Vec<(Coordinate, PieceId)>,
    /// Non-empty wait queues, front first.
    pub waiting: Vec<(Coordinate, Vec<WaitEntry>)>,
    /// Live ids, ascending.
    pub live: Vec<PieceId>,
}

impl BoardSnapshot {
    pub fn occupant(&self, at: Coordinate) -> PieceId {
        self.occupants
            .iter()
            .find(|(c, _)| *c == at)
            .map(|(_, id)| *id)
            .unwrap_or(PieceId::EMPTY)
    }

    pub fn position_of(&self, id: PieceId) -> Option<Coordinate> {
        self.occupants
            .iter()
            .find(|(_, occupant)| *occupant == id)
            .map(|(c, _)| *c)
    }
}

impl Grid {
    pub fn new(size: u8) -> Self {
        let cells = (0..usize::from(size) * usize::from(size))
            .map(|_| Cell::default())
            .collect();
        Self {
            size,
            cells,
            live: HashSet::new(),
        }
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn cell(&self, at: Coordinate) -> Option<&Cell> {
        at.index(self.size).map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, at: Coordinate) -> Option<&mut Cell> {
        at.index(self.size).map(move |i| &mut self.cells[i])
    }

    /// Occupant of `at`; [`PieceId::EMPTY`] for empty or out-of-range cells.
    pub fn occupant(&self, at: Coordinate) -> PieceId {
        self.cell(at).map_or(PieceId::EMPTY, |cell| cell.occupant)
    }

    pub fn is_live(&self, id: PieceId) -> bool {
        self.live.contains(&id)
    }

    /// Arbitrate one task and return the events it produced, in order.
    pub fn apply(&mut self, task: &BoardTask) -> Vec<BoardEvent> {
        if task.id.is_empty() {
            return vec![BoardEvent::reject(task.id, RejectReason::IncorrectId)];
        }

        let mut events = Vec::new();
        match task.kind {
            TaskKind::Place => self.place(task.id, task.to, &mut events),
            TaskKind::Move => self.move_piece(task.id, task.from, task.to, &mut events),
            TaskKind::CancelMove => self.cancel_move(task.id, task.from, task.to, &mut events),
            TaskKind::Remove => self.remove(task.id, task.from, &mut events),
        }
        events
    }

    fn place(&mut self, id: PieceId, to: Coordinate, events: &mut Vec<BoardEvent>) {
        if self.live.contains(&id) {
            events.push(BoardEvent::reject(id, RejectReason::DuplicateId));
            return;
        }
        let Some(cell) = self.cell_mut(to) else {
            events.push(BoardEvent::reject(id, RejectReason::IncorrectCoordinate));
            return;
        };

        if cell.is_empty() {
            cell.occupant = id;
            events.push(BoardEvent::Placed { id, to });
        } else {
            cell.waiters.push_back(WaitEntry {
                id,
                origin: Coordinate::INVALID,
            });
            debug!(piece = %id, cell = %to, "Placement queued behind occupant");
            events.push(BoardEvent::WaitingForCell {
                id,
                from: Coordinate::INVALID,
                to,
            });
        }
        self.live.insert(id);
    }

    fn move_piece(
        &mut self,
        id: PieceId,
        from: Coordinate,
        to: Coordinate,
        events: &mut Vec<BoardEvent>,
    ) {
        if !from.in_bounds(self.size) || !to.in_bounds(self.size) || from == to {
            events.push(BoardEvent::reject(id, RejectReason::IncorrectCoordinate));
            return;
        }
        if self.occupant(from) != id {
            events.push(BoardEvent::reject(id, RejectReason::IdMismatch));
            return;
        }

        if self.occupant(to).is_empty() {
            self.relocate(id, from, to, events);
            self.promote(from, events);
        } else if let Some(cell) = self.cell_mut(to) {
            cell.waiters.push_back(WaitEntry { id, origin: from });
            debug!(piece = %id, from = %from, cell = %to, "Move queued behind occupant");
            events.push(BoardEvent::WaitingForCell { id, from, to });
        }
    }

    fn cancel_move(
        &mut self,
        id: PieceId,
        from: Coordinate,
        to: Coordinate,
        events: &mut Vec<BoardEvent>,
    ) {
        let from_ok = from.is_invalid() || from.in_bounds(self.size);
        if !from_ok || !to.in_bounds(self.size) {
            events.push(BoardEvent::reject(id, RejectReason::IncorrectCoordinate));
            return;
        }
        // A placement waiter holds no cell; a move waiter must still hold its origin.
        if !from.is_invalid() && self.occupant(from) != id {
            events.push(BoardEvent::reject(id, RejectReason::IdMismatch));
            return;
        }

        let wanted = WaitEntry { id, origin: from };
        let Some(cell) = self.cell_mut(to) else {
            return;
        };
        match cell.waiters.iter().position(|entry| *entry == wanted) {
            Some(index) => {
                cell.waiters.remove(index);
                if from.is_invalid() {
                    self.live.remove(&id);
                }
                events.push(BoardEvent::CancelMoved { id, from, to });
            }
            None => events.push(BoardEvent::reject(id, RejectReason::WaiterNotFound)),
        }
    }

    fn remove(&mut self, id: PieceId, from: Coordinate, events: &mut Vec<BoardEvent>) {
        let Some(cell) = self.cell_mut(from) else {
            events.push(BoardEvent::reject(id, RejectReason::IncorrectCoordinate));
            return;
        };
        if cell.occupant != id {
            events.push(BoardEvent::reject(id, RejectReason::IdMismatch));
            return;
        }

        cell.occupant = PieceId::EMPTY;
        self.live.remove(&id);
        for cell in &mut self.cells {
            cell.waiters.retain(|entry| entry.id != id);
        }
        events.push(BoardEvent::Removed { id, from });
        self.promote(from, events);
    }

    fn relocate(
        &mut self,
        id: PieceId,
        from: Coordinate,
        to: Coordinate,
        events: &mut Vec<BoardEvent>,
    ) {
        if let Some(cell) = self.cell_mut(from) {
            cell.occupant = PieceId::EMPTY;
        }
        if let Some(cell) = self.cell_mut(to) {
            cell.occupant = id;
        }
        events.push(BoardEvent::Moved { id, from, to });
    }

    /// Grant freed cells to their waiters.
    ///
    /// Each granted move frees its origin, which is pushed onto the work list,
    /// so a chain of waiters resolves without recursion. Every iteration pops
    /// a wait entry, which bounds the loop.
    fn promote(&mut self, freed: Coordinate, events: &mut Vec<BoardEvent>) {
        let mut work = vec![freed];

        while let Some(cell_at) = work.pop() {
            loop {
                let Some(entry) = self.cell_mut(cell_at).and_then(|c| c.waiters.pop_front()) else {
                    break;
                };

                if !self.live.contains(&entry.id) {
                    trace!(piece = %entry.id, cell = %cell_at, "Discarding stale waiter");
                    continue;
                }

                if entry.origin.is_invalid() {
                    if let Some(cell) = self.cell_mut(cell_at) {
                        cell.occupant = entry.id;
                    }
                    debug!(piece = %entry.id, cell = %cell_at, "Waiting placement granted");
                    events.push(BoardEvent::Placed {
                        id: entry.id,
                        to: cell_at,
                    });
                    break;
                }

                if self.occupant(entry.origin) != entry.id {
                    trace!(
                        piece = %entry.id,
                        origin = %entry.origin,
                        cell = %cell_at,
                        "Discarding waiter that no longer holds its origin"
                    );
                    continue;
                }

                debug!(piece = %entry.id, from = %entry.origin, cell = %cell_at, "Waiting move granted");
                self.relocate(entry.id, entry.origin, cell_at, events);
                work.push(entry.origin);
                break;
            }
        }
    }

    /// Release every queued waiter with a `boardStopped` rejection.
    pub fn release_waiters(&mut self) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        for cell in &mut self.cells {
            for entry in cell.waiters.drain(..) {
                events.push(BoardEvent::reject(entry.id, RejectReason::BoardStopped));
            }
        }
        events
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let mut snapshot = BoardSnapshot {
            size: self.size,
            ..Default::default()
        };
        let size = i32::from(self.size);
        for (index, cell) in self.cells.iter().enumerate() {
            let index = index as i32;
            let at = Coordinate::new(index % size, index / size);
            if !cell.is_empty() {
                snapshot.occupants.push((at, cell.occupant));
            }
            if !cell.waiters.is_empty() {
                snapshot.waiting.push((at, cell.waiters.iter().copied().collect()));
            }
        }
        snapshot.live = self.live.iter().copied().collect();
        snapshot.live.sort();
        snapshot
    }
}

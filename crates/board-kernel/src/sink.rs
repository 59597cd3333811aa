//! Subscriber contract and the registry the board fans events out through.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::warn;

use crate::messages::BoardEvent;
use crate::piece::PieceId;

/// Receives board events.
///
/// Called synchronously from the board's arbitration context, so an
/// implementation must return promptly and must not call back into the board
/// and wait for the result. Other subscribers receive the same events.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &BoardEvent);
}

/// Registered subscribers, held weakly.
///
/// The board never keeps a subscriber alive: whoever registers a sink owns it,
/// and a dropped sink simply stops receiving events. The registry has its own
/// lock, independent of the grid, and the lock is not held while events are
/// delivered.
#[derive(Clone, Default)]
pub struct Subscribers {
    sinks: Arc<Mutex<Vec<Weak<dyn EventSink>>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sink: &Arc<dyn EventSink>) {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.push(Arc::downgrade(sink));
    }

    /// Unregister `sink`. Returns false if it was not registered.
    pub fn remove(&self, sink: &Arc<dyn EventSink>) -> bool {
        let target = Arc::as_ptr(sink) as *const ();
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sinks.len();
        sinks.retain(|weak| weak.as_ptr() as *const () != target);
        sinks.len() != before
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        let sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.iter().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `events` in order to every subscriber, in registration order.
    pub fn publish(&self, events: &[BoardEvent]) {
        if events.is_empty() {
            return;
        }

        let targets: Vec<Arc<dyn EventSink>> = {
            let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
            sinks.retain(|weak| weak.strong_count() > 0);
            sinks.iter().filter_map(Weak::upgrade).collect()
        };

        for event in events {
            for sink in &targets {
                if catch_unwind(AssertUnwindSafe(|| sink.on_event(event))).is_err() {
                    warn!(event = ?event, "Subscriber panicked while handling event");
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("live", &self.len())
            .finish()
    }
}

/// Forwards events into an unbounded tokio channel, optionally only those for
/// a single piece. Sending never blocks the board.
#[derive(Debug)]
pub struct ChannelSink {
    only: Option<PieceId>,
    tx: mpsc::UnboundedSender<BoardEvent>,
}

impl ChannelSink {
    /// Forward every event.
    pub fn new(tx: mpsc::UnboundedSender<BoardEvent>) -> Self {
        Self { only: None, tx }
    }

    /// Forward only events whose id is `id`.
    pub fn for_piece(id: PieceId, tx: mpsc::UnboundedSender<BoardEvent>) -> Self {
        Self { only: Some(id), tx }
    }

    /// Convenience: a sink plus the receiving end of its channel.
    pub fn channel(only: Option<PieceId>) -> (Arc<dyn EventSink>, mpsc::UnboundedReceiver<BoardEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn EventSink> = Arc::new(Self { only, tx });
        (sink, rx)
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: &BoardEvent) {
        if self.only.is_some_and(|id| id != event.id()) {
            return;
        }
        // Receiver gone means the owner stopped listening; nothing to do.
        let _ = self.tx.send(*event);
    }
}

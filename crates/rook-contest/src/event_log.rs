//! Board printer: one line per board event, plus per-kind tallies.
//!
//! Events are counted on the publishing thread. Formatted lines go over a
//! channel to a blocking writer task; the board's handler never touches the
//! output itself.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::warn;

use board_kernel::{BoardEvent, Coordinate, EventSink, RejectReason};

/// Event counts for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventTally {
    pub placed: u64,
    pub moved: u64,
    pub cancel_moved: u64,
    pub removed: u64,
    pub waiting_for_cell: u64,
    pub rejected: BTreeMap<RejectReason, u64>,
}

impl EventTally {
    pub fn total(&self) -> u64 {
        self.placed
            + self.moved
            + self.cancel_moved
            + self.removed
            + self.waiting_for_cell
            + self.rejected.values().sum::<u64>()
    }
}

/// Subscriber that prints every board event.
///
/// Lines look like `ID: 3 A5 -> A7`; a move or wait without an origin
/// (a placement) omits the `from` cell.
pub struct EventLogger {
    /// `None` once finished, or for a silent logger.
    lines: Mutex<Option<UnboundedSender<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    placed: AtomicU64,
    moved: AtomicU64,
    cancel_moved: AtomicU64,
    removed: AtomicU64,
    waiting_for_cell: AtomicU64,
    rejected: Mutex<BTreeMap<RejectReason, u64>>,
}

impl std::fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLogger")
            .field("tally", &self.tally())
            .finish()
    }
}

impl EventLogger {
    /// Print to `out` from a blocking writer task. Must be called inside a
    /// tokio runtime.
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        let (lines, pending) = unbounded_channel();
        let writer = tokio::task::spawn_blocking(move || write_lines(out, pending));
        Self::with_output(Some(lines), Some(writer))
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Counts events without printing them.
    pub fn silent() -> Self {
        Self::with_output(None, None)
    }

    fn with_output(lines: Option<UnboundedSender<String>>, writer: Option<JoinHandle<()>>) -> Self {
        Self {
            lines: Mutex::new(lines),
            writer: Mutex::new(writer),
            placed: AtomicU64::new(0),
            moved: AtomicU64::new(0),
            cancel_moved: AtomicU64::new(0),
            removed: AtomicU64::new(0),
            waiting_for_cell: AtomicU64::new(0),
            rejected: Mutex::new(BTreeMap::new()),
        }
    }

    /// Stop printing and wait until every line sent so far is written.
    ///
    /// Events seen afterwards are still counted. Idempotent.
    pub async fn finish(&self) {
        drop(self.lines.lock().unwrap_or_else(PoisonError::into_inner).take());
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(error = %e, "Event log writer failed");
            }
        }
    }

    /// Print the symbol legend.
    pub fn print_legend(&self) {
        self.write_line(
            "Event log started.\n    \"-O\" - placed\n    \"-X\" - removed\n    \"->\" - moved\n    \"-?\" - wait\n    \"X?\" - cancel wait\n    \"XX\" - reject",
        );
    }

    pub fn tally(&self) -> EventTally {
        EventTally {
            placed: self.placed.load(Ordering::Relaxed),
            moved: self.moved.load(Ordering::Relaxed),
            cancel_moved: self.cancel_moved.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            waiting_for_cell: self.waiting_for_cell.load(Ordering::Relaxed),
            rejected: self
                .rejected
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    fn count(&self, event: &BoardEvent) {
        let counter = match event {
            BoardEvent::Placed { .. } => &self.placed,
            BoardEvent::Moved { .. } => &self.moved,
            BoardEvent::CancelMoved { .. } => &self.cancel_moved,
            BoardEvent::Removed { .. } => &self.removed,
            BoardEvent::WaitingForCell { .. } => &self.waiting_for_cell,
            BoardEvent::Reject { reason, .. } => {
                *self
                    .rejected
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(*reason)
                    .or_default() += 1;
                return;
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn write_line(&self, line: impl Into<String>) {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lines) = lines.as_ref() {
            // Fails only if the writer task died; it has logged why.
            let _ = lines.send(line.into());
        }
    }
}

fn write_lines(mut out: Box<dyn Write + Send>, mut pending: UnboundedReceiver<String>) {
    while let Some(line) = pending.blocking_recv() {
        if let Err(e) = writeln!(out, "{line}") {
            warn!(error = %e, "Event log write failed");
            return;
        }
    }
    if let Err(e) = out.flush() {
        warn!(error = %e, "Event log flush failed");
    }
}

/// Render one event the way the log prints it.
pub fn format_event(event: &BoardEvent) -> String {
    let mut line = format!("ID: {}", event.id());
    let _ = match *event {
        BoardEvent::Placed { to, .. } => write!(line, " -O {to}"),
        BoardEvent::Moved { from, to, .. } => write!(line, "{} {to}", with_origin(from, "->")),
        BoardEvent::CancelMoved { from, to, .. } => write!(line, "{} {to}", with_origin(from, "X?")),
        BoardEvent::WaitingForCell { from, to, .. } => write!(line, "{} {to}", with_origin(from, "-?")),
        BoardEvent::Removed { from, .. } => write!(line, " -X {from}"),
        BoardEvent::Reject { reason, .. } => write!(line, " XX {reason}"),
    };
    line
}

fn with_origin(from: Coordinate, symbol: &str) -> String {
    if from.is_invalid() {
        format!(" {symbol}")
    } else {
        format!(" {from} {symbol}")
    }
}

impl EventSink for EventLogger {
    fn on_event(&self, event: &BoardEvent) {
        self.count(event);
        self.write_line(format_event(event));
    }
}

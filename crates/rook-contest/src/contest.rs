//! Contest coordinator: owns the board, the event log and the participants.
//!
//! A run goes through fixed phases:
//! 1. Start the board and subscribe the event log
//! 2. Spawn one participant per piece (optionally behind a start barrier)
//! 3. Wait until every participant stops, the deadline passes, or Ctrl-C
//! 4. Ordered shutdown: signal participants, join them, let the board apply
//!    their cleanup, stop it, flush the event log, then shut the actor
//!    runtime down

use std::future::pending;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use acton_reactive::prelude::*;
use anyhow::{ensure, Context, Result};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Barrier};
use tracing::{error, info, warn};
use uuid::Uuid;

use board_kernel::{
    BoardActor, EventSink, Participant, ParticipantReport, PieceIdAllocator, PieceKind,
    TimingConfig, MIN_BOARD_SIZE,
};

use crate::event_log::EventLogger;
use crate::results::{EndReason, RunSummary};

/// Configuration for one contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContestConfig {
    /// Side length of the square board
    pub board_size: u8,
    /// Number of rooks, one participant each
    pub participants: u32,
    /// Successful moves per participant before it retires its piece (None = unbounded)
    pub steps: Option<u32>,
    /// Hard limit on the run (None = until every participant stops, or Ctrl-C)
    pub max_duration_ms: Option<u64>,
    /// Base seed for participant RNGs (None = random)
    pub seed: Option<u64>,
    /// Hold every participant at a barrier until all have subscribed
    pub synchronized_start: bool,
    /// Participant wait periods
    pub timing: TimingConfig,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            board_size: 8,
            participants: 4,
            steps: Some(30),
            max_duration_ms: Some(60_000),
            seed: None,
            synchronized_start: true,
            timing: TimingConfig::default(),
        }
    }
}

impl ContestConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.board_size >= MIN_BOARD_SIZE,
            "board_size must be at least {}, got {}",
            MIN_BOARD_SIZE,
            self.board_size
        );
        ensure!(self.participants > 0, "participants must be at least 1");
        let cells = u32::from(self.board_size) * u32::from(self.board_size);
        ensure!(
            self.participants <= cells,
            "{} participants do not fit on {} cells",
            self.participants,
            cells
        );
        ensure!(
            self.timing.next_step_min_ms <= self.timing.next_step_max_ms,
            "next_step_min_ms ({}) exceeds next_step_max_ms ({})",
            self.timing.next_step_min_ms,
            self.timing.next_step_max_ms
        );
        Ok(())
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }
}

/// Runs contests.
pub struct ContestRunner {
    config: ContestConfig,
    logger: Option<Arc<EventLogger>>,
}

impl ContestRunner {
    pub fn new(config: ContestConfig) -> Self {
        Self {
            config,
            logger: None,
        }
    }

    /// Use `logger` instead of printing to stdout. The logger is finished at
    /// the end of the run.
    pub fn with_event_log(mut self, logger: Arc<EventLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &ContestConfig {
        &self.config
    }

    /// Run one contest to completion.
    ///
    /// Protocol violations do not fail this call; they are listed in
    /// [`RunSummary::failures`] after an orderly shutdown.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let seed = self.config.seed.unwrap_or_else(rand::random);

        info!(
            run_id = %run_id,
            board_size = self.config.board_size,
            participants = self.config.participants,
            steps = ?self.config.steps,
            seed,
            "Starting contest"
        );

        let mut runtime = ActonApp::launch_async().await;
        let board = BoardActor::start(&mut runtime, self.config.board_size).await?;

        let logger = self
            .logger
            .clone()
            .unwrap_or_else(|| Arc::new(EventLogger::stdout()));
        logger.print_legend();
        let log_sink: Arc<dyn EventSink> = logger.clone();
        board.add_subscriber(&log_sink);

        let (stop_tx, stop_rx) = watch::channel(false);
        let count = self.config.participants as usize;
        let barrier = self
            .config
            .synchronized_start
            .then(|| Arc::new(Barrier::new(count)));

        let mut ids = PieceIdAllocator::new();
        let handles: Vec<_> = (0..count)
            .map(|_| {
                let id = ids.next_id();
                let participant = Participant::new(
                    id,
                    PieceKind::Rook,
                    self.config.steps,
                    self.config.timing.clone(),
                    seed.wrapping_add(u64::from(id.0)),
                );
                tokio::spawn(participant.run(board.clone(), stop_rx.clone(), barrier.clone()))
            })
            .collect();
        drop(stop_rx);

        let all_stopped = join_all(handles);
        tokio::pin!(all_stopped);

        let deadline = self.config.max_duration();
        let timer = async move {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => pending::<()>().await,
            }
        };

        let (joined, ended_by) = tokio::select! {
            joined = &mut all_stopped => (joined, EndReason::Completed),
            _ = timer => {
                info!(run_id = %run_id, "Deadline reached, stopping participants");
                let _ = stop_tx.send(true);
                (all_stopped.await, EndReason::Deadline)
            }
            _ = tokio::signal::ctrl_c() => {
                info!(run_id = %run_id, "Interrupted, stopping participants");
                let _ = stop_tx.send(true);
                (all_stopped.await, EndReason::Interrupted)
            }
        };

        // Cleanup requests sent by stopping participants are applied before
        // the board stops rejecting work.
        board.settle().await;
        board.stop().await;

        let mut participants: Vec<ParticipantReport> = Vec::with_capacity(count);
        let mut failures = Vec::new();
        for result in joined {
            match result {
                Ok(Ok(report)) => participants.push(report),
                Ok(Err(violation)) => failures.push(violation.to_string()),
                Err(join_error) => {
                    error!(error = %join_error, "Participant task failed");
                    failures.push(format!("participant task failed: {join_error}"));
                }
            }
        }

        let final_board = board.snapshot();
        board.remove_subscriber(&log_sink);
        logger.finish().await;
        let _ = runtime.shutdown_all().await;

        let summary = RunSummary {
            run_id,
            started_at,
            ended_at: Utc::now(),
            ended_by,
            config: self.config.clone(),
            seed,
            participants,
            failures,
            events: logger.tally(),
            final_board,
        };

        if summary.succeeded() {
            info!(
                run_id = %run_id,
                ended_by = ?summary.ended_by,
                moves = summary.total_moves(),
                duration_ms = summary.duration_ms(),
                "Contest finished"
            );
        } else {
            warn!(
                run_id = %run_id,
                failures = summary.failures.len(),
                "Contest finished with failures"
            );
        }

        Ok(summary)
    }
}

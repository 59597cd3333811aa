//! Run summary for a contest.
//!
//! Captures:
//! - Run identity and wall-clock span
//! - The effective configuration and seed
//! - Per-participant reports and failures
//! - Event tallies and the final occupancy

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use board_kernel::{BoardSnapshot, ParticipantReport};

use crate::contest::ContestConfig;
use crate::event_log::EventTally;

/// What ended a contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Every participant reached `Stop` on its own.
    Completed,
    /// `max_duration_ms` elapsed.
    Deadline,
    /// Ctrl-C.
    Interrupted,
}

/// Results from a single contest run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub ended_by: EndReason,
    pub config: ContestConfig,
    /// Base seed actually used; participant `id` ran with `seed + id`.
    pub seed: u64,
    pub participants: Vec<ParticipantReport>,
    /// Protocol violations and crashed participant tasks.
    pub failures: Vec<String>,
    pub events: EventTally,
    pub final_board: BoardSnapshot,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_moves(&self) -> u64 {
        self.participants
            .iter()
            .map(|report| u64::from(report.stats.moves))
            .sum()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// Save the summary as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

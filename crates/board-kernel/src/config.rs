//! Participant timing configuration.

use std::time::Duration;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// How long a participant waits for an event before treating the wait as a timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Waiting for the board to confirm a request (milliseconds)
    pub confirm_ms: u64,

    /// Waiting for a contended cell to be granted (milliseconds)
    pub wait_for_cell_ms: u64,

    /// Lower bound of the randomized pause between steps (milliseconds)
    pub next_step_min_ms: u64,

    /// Upper bound of the randomized pause between steps (milliseconds)
    pub next_step_max_ms: u64,
}

impl TimingConfig {
    pub fn confirm(&self) -> Duration {
        Duration::from_millis(self.confirm_ms)
    }

    pub fn wait_for_cell(&self) -> Duration {
        Duration::from_millis(self.wait_for_cell_ms)
    }

    /// A pause drawn uniformly from the next-step range, desynchronizing participants.
    pub fn next_step(&self, rng: &mut dyn RngCore) -> Duration {
        let (low, high) = if self.next_step_min_ms <= self.next_step_max_ms {
            (self.next_step_min_ms, self.next_step_max_ms)
        } else {
            (self.next_step_max_ms, self.next_step_min_ms)
        };
        Duration::from_millis(rng.random_range(low..=high))
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            confirm_ms: 500,
            wait_for_cell_ms: 5_000,
            next_step_min_ms: 200,
            next_step_max_ms: 300,
        }
    }
}

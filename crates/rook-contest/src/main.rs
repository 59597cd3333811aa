//! Rook Contest CLI.
//!
//! Commands:
//! - run: Run one contest and print its summary
//! - show-config: Print the effective configuration as JSON

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rook_contest::contest::{ContestConfig, ContestRunner};

/// Generate a timestamped output path from the given path.
/// e.g., "contest.json" -> "contest-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("contest");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "rook-contest")]
#[command(version)]
#[command(about = "Rooks contending for cells on a shared board")]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long, env = "ROOK_CONTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by `run` and `show-config`.
#[derive(clap::Args)]
struct Overrides {
    /// Board side length
    #[arg(long)]
    board_size: Option<u8>,

    /// Number of rooks
    #[arg(long)]
    participants: Option<u32>,

    /// Successful moves per rook before it leaves the board
    #[arg(long, conflicts_with = "unbounded")]
    steps: Option<u32>,

    /// Let rooks move until the run is stopped
    #[arg(long)]
    unbounded: bool,

    /// Stop the contest after this many milliseconds
    #[arg(long)]
    max_duration_ms: Option<u64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Start each rook as soon as it is spawned
    #[arg(long)]
    no_sync_start: bool,
}

impl Overrides {
    fn apply(self, config: &mut ContestConfig) {
        if let Some(board_size) = self.board_size {
            config.board_size = board_size;
        }
        if let Some(participants) = self.participants {
            config.participants = participants;
        }
        if self.unbounded {
            config.steps = None;
        } else if let Some(steps) = self.steps {
            config.steps = Some(steps);
        }
        if let Some(limit) = self.max_duration_ms {
            config.max_duration_ms = Some(limit);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.no_sync_start {
            config.synchronized_start = false;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single contest
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Save the run summary as JSON (timestamped)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    ShowConfig {
        #[command(flatten)]
        overrides: Overrides,
    },
}

fn effective_config(path: Option<&Path>, overrides: Overrides) -> Result<ContestConfig> {
    let mut config = match path {
        Some(path) => ContestConfig::load(path)?,
        None => ContestConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run { overrides, output } => {
            let config = effective_config(cli.config.as_deref(), overrides)?;
            let summary = ContestRunner::new(config).run().await?;

            println!("\n=== Contest Result ===");
            println!("Run: {}", summary.run_id);
            println!(
                "Board: {0}x{0}, rooks: {1}, seed: {2}",
                summary.config.board_size, summary.config.participants, summary.seed
            );
            println!("Ended by: {:?} after {} ms", summary.ended_by, summary.duration_ms());
            println!("Total moves: {}", summary.total_moves());

            println!("\nParticipants:");
            println!(
                "  {:>4} {:>6} {:>6} {:>8} {:>8} {:>8} {:>14}",
                "ID", "Moves", "Waits", "Timeouts", "Cancels", "Final", "State"
            );
            for report in &summary.participants {
                println!(
                    "  {:>4} {:>6} {:>6} {:>8} {:>8} {:>8} {:>14}",
                    report.id,
                    report.stats.moves,
                    report.stats.waits,
                    report.stats.timeouts,
                    report.stats.cancellations,
                    report.final_position,
                    report.final_state
                );
            }

            println!("\nEvents:");
            println!("  Placed: {}", summary.events.placed);
            println!("  Moved: {}", summary.events.moved);
            println!("  Waits: {}", summary.events.waiting_for_cell);
            println!("  Cancelled waits: {}", summary.events.cancel_moved);
            println!("  Removed: {}", summary.events.removed);
            for (reason, count) in &summary.events.rejected {
                println!("  Rejected ({}): {}", reason, count);
            }

            if !summary.final_board.occupants.is_empty() {
                println!("\nLeft on board:");
                for (cell, id) in &summary.final_board.occupants {
                    println!("  {} at {}", id, cell);
                }
            }

            if let Some(output) = output {
                let output_path = timestamped_path(&output);
                summary.save(&output_path)?;
                info!(path = %output_path.display(), "Summary saved");
                println!("\nSummary saved to: {}", output_path.display());
            }

            if !summary.succeeded() {
                for failure in &summary.failures {
                    eprintln!("failure: {}", failure);
                }
                anyhow::bail!("contest ended with {} failure(s)", summary.failures.len());
            }
        }

        Commands::ShowConfig { overrides } => {
            let config = effective_config(cli.config.as_deref(), overrides)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Trail camera image triage: detection, review, dataset export, training.
#[derive(Debug, Parser)]
#[command(name = "camtrap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Data directory (overrides config).
    #[arg(long, global = true, env = "CAMTRAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run detection over incoming images and store predictions.
    Detect {
        /// Reprocess images that already have a prediction.
        #[arg(long)]
        force: bool,

        /// Detection threshold (0.0-1.0, overrides config).
        #[arg(short = 't', long, value_parser = parse_confidence, env = "CAMTRAP_THRESHOLD")]
        threshold: Option<f32>,

        /// Suppress the progress bar.
        #[arg(long)]
        no_progress: bool,
    },
    /// Rank unreviewed images by prediction uncertainty.
    Review {
        /// Maximum queue entries (overrides config).
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write the queue as CSV to this path instead of printing JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show annotation and prediction statistics.
    Stats,
    /// Export reviewed annotations as a training dataset.
    Export {
        /// Validation fraction (0.0 up to 1.0, overrides config).
        #[arg(long, value_parser = parse_fraction)]
        val_fraction: Option<f32>,

        /// Shuffle seed (overrides config).
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a training cycle, or inspect training state.
    Train {
        /// Show the training job status instead of running.
        #[arg(long, conflicts_with_all = ["check", "base_model"])]
        status: bool,

        /// Check whether retraining is due instead of running.
        #[arg(long, conflicts_with = "base_model")]
        check: bool,

        /// Base model handed to the trainer (overrides config).
        #[arg(short, long)]
        base_model: Option<String>,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Parse and validate a confidence value.
fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "confidence must be between 0.0 and 1.0, got {value}"
        ));
    }

    Ok(value)
}

/// Parse and validate a split fraction.
fn parse_fraction(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..1.0).contains(&value) {
        return Err(format!(
            "fraction must be at least 0.0 and below 1.0, got {value}"
        ));
    }

    Ok(value)
}

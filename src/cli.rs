//! # Command-Line Interface Module
//!
//! Clap definitions for the `moodq` binary.
//!
//! ## Commands
//!
//! - `run`: Replay a recorded frame stream through a full session
//! - `labels`: Feed labels straight to the debouncer and print transitions
//! - `config`: Print the effective configuration
//!
//! ## Examples
//!
//! ```bash
//! moodq run --frames session.jsonl --catalog catalog.json --dry-run
//! moodq labels neutral neutral neutral sad sad happy sad sad sad
//! moodq config --config ~/.config/moodq/config.json
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SessionConfig;
use crate::emotion::EmotionLabel;

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "moodq")]
#[command(about = "moodq: Mood-driven queues - stable emotion signals steering a playback queue")]
#[command(version)]
pub struct Args {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "MOODQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a session over a recorded frame stream
    ///
    /// Each line of the frame file is one frame: a detection object such as
    /// {"dominant": "happy", "confidence": {"happy": 91.2}}, null for no face,
    /// or {"error": "..."} for a failed classification.
    Run {
        /// JSON-lines frame script
        #[arg(long)]
        frames: PathBuf,

        /// JSON playlist catalog to search
        #[arg(long)]
        catalog: PathBuf,

        /// Keep the queue in memory instead of driving MPD
        #[arg(long)]
        dry_run: bool,

        /// MPD host passed to mpc
        #[arg(long, env = "MPD_HOST")]
        host: Option<String>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Feed labels directly to the debouncer
    ///
    /// Uses a dry-run queue; tracks come from the catalog when one is given.
    Labels {
        /// Labels in order, e.g. happy happy sad
        #[arg(required = true)]
        labels: Vec<EmotionLabel>,

        /// JSON playlist catalog to search
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        tuning: Tuning,
    },
}

/// Per-run overrides for config values.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct Tuning {
    /// Labels kept for the majority vote
    #[arg(long)]
    pub window: Option<usize>,

    /// Consecutive confirmations before switching emotion
    #[arg(long)]
    pub threshold: Option<u32>,

    /// Top up when fewer tracks than this are queued
    #[arg(long)]
    pub low_water: Option<usize>,

    /// Queue length a top-up aims for
    #[arg(long)]
    pub refill_target: Option<usize>,

    /// Classify every Nth frame
    #[arg(long)]
    pub analysis_interval: Option<u64>,

    /// Emit the smoothed label every Nth frame
    #[arg(long)]
    pub check_interval: Option<u64>,

    /// Tracks requested on an emotion switch
    #[arg(long)]
    pub switch_batch: Option<usize>,

    /// Seed for the playlist query choice
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Tuning {
    /// Writes every given override into `config`.
    pub fn apply(&self, config: &mut SessionConfig) {
        if let Some(v) = self.window {
            config.window_capacity = v;
        }
        if let Some(v) = self.threshold {
            config.stability_threshold = v;
        }
        if let Some(v) = self.low_water {
            config.low_water = v;
        }
        if let Some(v) = self.refill_target {
            config.refill_target = v;
        }
        if let Some(v) = self.analysis_interval {
            config.analysis_interval = v;
        }
        if let Some(v) = self.check_interval {
            config.check_interval = v;
        }
        if let Some(v) = self.switch_batch {
            config.switch_batch = v;
        }
        if self.seed.is_some() {
            config.provider.seed = self.seed;
        }
    }
}

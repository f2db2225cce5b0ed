//! # moodq - Mood-Driven Queues
//!
//! Turns a jittery per-frame emotion stream into a stable mood and keeps a
//! playback queue in step with it.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a recorded classification stream against MPD
//! moodq run --frames session.jsonl --catalog catalog.json
//!
//! # Same, without touching MPD
//! moodq run --frames session.jsonl --catalog catalog.json --dry-run
//!
//! # Watch the debouncer react to a label sequence
//! moodq labels neutral neutral neutral sad sad happy sad sad sad
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use moodq::cli::{self, Command};
use moodq::config::SessionConfig;
use moodq::debounce::Transition;
use moodq::playback::{MemorySink, MpcSink, PlaybackSink};
use moodq::queue::{QueueController, QueuePolicy};
use moodq::session::{MoodSession, SessionReport};
use moodq::source::{ScriptedClassifier, ScriptedFrames};
use moodq::tracks::{LocalCatalog, PlaylistTrackProvider};

/// Resolves the config file and applies per-run overrides.
fn effective_config(path: Option<&std::path::Path>, tuning: &cli::Tuning) -> Result<SessionConfig> {
    let mut config = SessionConfig::load(path)?;
    tuning.apply(&mut config);
    config.validate().context("Invalid configuration after command-line overrides")?;
    debug!("Effective config: {config:?}");
    Ok(config)
}

fn run_session<S: PlaybackSink>(
    config: &SessionConfig,
    frames: ScriptedFrames,
    catalog: LocalCatalog,
    sink: S,
) -> SessionReport {
    let provider = PlaylistTrackProvider::from_config(catalog, &config.provider);
    let controller = QueueController::with_policy(provider, sink, QueuePolicy::from(config));
    let mut session = MoodSession::new(config, controller);

    let mut source = frames;
    session.run(&mut source, &mut ScriptedClassifier)
}

fn print_report(report: &SessionReport) {
    println!("Frames read:            {}", report.frames);
    println!("Frames classified:      {}", report.classified);
    println!("Classification errors:  {}", report.classification_errors);
    println!("Labels emitted:         {}", report.emitted);
    println!("Emotion changes:        {}", report.changes);
    match report.confirmed {
        Some(label) => println!("Final emotion:          {label}"),
        None => println!("Final emotion:          (none confirmed)"),
    }
}

/// Main entry point for moodq.
///
/// Logging goes through `env_logger`, controlled by `RUST_LOG`
/// (`RUST_LOG=moodq=debug moodq run ...`). `--verbose` switches the default
/// level to debug when `RUST_LOG` is unset.
fn main() -> Result<()> {
    let args = cli::Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match args.command {
        Command::Run {
            frames,
            catalog,
            dry_run,
            host,
            tuning,
        } => {
            let config = effective_config(args.config.as_deref(), &tuning)?;
            let frames = ScriptedFrames::from_file(&frames)?;
            let catalog = LocalCatalog::from_file(&catalog)?;
            info!("Loaded {} frames and {} playlists", frames.len(), catalog.playlists.len());

            let report = if dry_run {
                run_session(&config, frames, catalog, MemorySink::new())
            } else {
                let sink = match host {
                    Some(host) => MpcSink::new().with_host(host),
                    None => MpcSink::new(),
                };
                sink.check().context("Cannot start session: MPD connection failed")?;
                run_session(&config, frames, catalog, sink)
            };
            print_report(&report);
        }
        Command::Labels {
            labels,
            catalog,
            tuning,
        } => {
            let config = effective_config(args.config.as_deref(), &tuning)?;
            let catalog = match catalog {
                Some(path) => LocalCatalog::from_file(&path)?,
                None => LocalCatalog::default(),
            };
            let provider = PlaylistTrackProvider::from_config(catalog, &config.provider);
            let controller =
                QueueController::with_policy(provider, MemorySink::new(), QueuePolicy::from(&config));
            let mut session = MoodSession::new(&config, controller);

            for (label, transition) in labels.iter().zip(session.replay_labels(labels.clone())) {
                match transition {
                    Transition::Stable(_) => println!("{label:<9} stable"),
                    Transition::Pending { count, .. } => {
                        println!("{label:<9} pending {count}/{}", config.stability_threshold)
                    }
                    Transition::Confirmed { from: Some(from), to } => {
                        println!("{label:<9} CHANGED {from} -> {to}")
                    }
                    Transition::Confirmed { from: None, to } => println!("{label:<9} CONFIRMED {to}"),
                }
            }

            let sink = session.queue().sink();
            println!(
                "Now playing: {} ({} queued)",
                sink.now_playing().unwrap_or("nothing"),
                sink.upcoming().len()
            );
        }
        Command::Config { tuning } => {
            let config = effective_config(args.config.as_deref(), &tuning)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

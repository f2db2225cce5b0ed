//! Mood-driven playback queues.
//!
//! A face classifier reports an emotion for every few video frames. Those
//! reports flicker. moodq turns them into a stable mood and keeps a playback
//! queue matched to it.
//!
//! Core modules:
//! - [`smoother`] - Rolling-window majority vote over raw labels
//! - [`debounce`] - Stability state machine (consecutive confirmations)
//! - [`queue`] - Queue switch and top-up against a playback sink
//! - [`session`] - Per-frame control loop tying it all together
//!
//! ### Supporting Modules
//!
//! - [`emotion`] - Emotion labels and detection records
//! - [`tracks`] - Playlist-search track provider and catalogs
//! - [`playback`] - Playback sinks (MPD via `mpc`, in-memory)
//! - [`source`] - Frame sources, classifiers and emission cadence
//! - [`config`] - Session tunables and config file loading
//! - [`error`] - Error kinds for the external collaborators
//! - [`cli`] - Command-line interface definitions with clap integration
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use moodq::config::SessionConfig;
//! use moodq::playback::MemorySink;
//! use moodq::queue::{QueueController, QueuePolicy};
//! use moodq::session::MoodSession;
//! use moodq::source::{ScriptedClassifier, ScriptedFrames};
//! use moodq::tracks::{LocalCatalog, PlaylistTrackProvider};
//! use std::path::Path;
//!
//! let config = SessionConfig::default();
//! let catalog = LocalCatalog::from_file(Path::new("catalog.json"))?;
//! let provider = PlaylistTrackProvider::from_config(catalog, &config.provider);
//! let controller = QueueController::with_policy(provider, MemorySink::new(), QueuePolicy::from(&config));
//!
//! let mut session = MoodSession::new(&config, controller);
//! let mut frames = ScriptedFrames::from_file(Path::new("frames.jsonl"))?;
//! let report = session.run(&mut frames, &mut ScriptedClassifier);
//! println!("Settled on {:?} after {} changes", report.confirmed, report.changes);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## How a mood is decided
//!
//! 1. Every `analysis_interval` frames the classifier runs. Its dominant label
//!    joins a five-label window and the window's majority becomes the smoothed
//!    label.
//! 2. Every `check_interval` frames the latest smoothed label is emitted.
//! 3. An emitted label has to repeat `stability_threshold` times in a row
//!    before it becomes the confirmed mood. A confirmed change restarts
//!    playback with fresh tracks; a repeat of the confirmed mood tops the queue
//!    up when it runs low.
//!
//! ## Error Handling
//!
//! Failures of the classifier, the track catalog or the player are typed
//! ([`error`]) but never stop a session: they are logged and the next frame or
//! the next emitted label is the retry. Configuration and file loading return
//! `anyhow::Result`.
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```

pub mod cli;
pub mod config;
pub mod debounce;
pub mod emotion;
pub mod error;
pub mod playback;
pub mod queue;
pub mod session;
pub mod smoother;
pub mod source;
pub mod tracks;

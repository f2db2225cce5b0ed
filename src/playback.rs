//! # Playback Sinks
//!
//! The remote player the queue controller drives. A sink can start playback
//! from a list of track references (replacing whatever was queued), append one
//! reference, and report how many tracks are still waiting to play.
//!
//! Two implementations ship with the crate:
//! - [`MpcSink`] drives MPD through the `mpc` command-line client.
//! - [`MemorySink`] keeps the queue in memory, for dry runs.

use log::{debug, info};
use std::process::{Command, Output};

use crate::error::PlaybackError;

/// Number of tracks waiting after the current one, read at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub size: usize,
}

/// Start/enqueue/inspect operations on a playback service.
pub trait PlaybackSink {
    /// Replaces the queue with `uris` and starts playing the first one.
    fn start_playback(&mut self, uris: &[String]) -> Result<(), PlaybackError>;

    /// Appends one track to the end of the queue.
    fn enqueue(&mut self, uri: &str) -> Result<(), PlaybackError>;

    fn queue(&mut self) -> Result<QueueSnapshot, PlaybackError>;
}

/// MPD through `mpc`. Track references are MPD-relative paths or stream URLs.
#[derive(Debug, Clone)]
pub struct MpcSink {
    program: String,
    host: Option<String>,
}

impl MpcSink {
    pub fn new() -> Self {
        Self {
            program: "mpc".to_string(),
            host: None,
        }
    }

    /// Talk to a specific MPD host (`mpc --host`).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Checks that `mpc` is installed and MPD answers.
    pub fn check(&self) -> Result<(), PlaybackError> {
        self.run(&["version"]).map(|_| ())
    }

    fn run(&self, args: &[&str]) -> Result<Output, PlaybackError> {
        let mut command = Command::new(&self.program);
        if let Some(host) = &self.host {
            command.arg("--host").arg(host);
        }
        let output = command.args(args).output().map_err(|e| {
            PlaybackError::Unavailable(format!(
                "failed to execute {}: {e}. Please install mpc (MPD client)",
                self.program
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlaybackError::Rejected {
                command: args.join(" "),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl Default for MpcSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSink for MpcSink {
    fn start_playback(&mut self, uris: &[String]) -> Result<(), PlaybackError> {
        self.run(&["clear"])?;
        for uri in uris {
            debug!("Adding to MPD queue: {uri}");
            self.run(&["add", uri])?;
        }
        self.run(&["play"])?;
        info!("Started MPD playback with {} tracks", uris.len());
        Ok(())
    }

    fn enqueue(&mut self, uri: &str) -> Result<(), PlaybackError> {
        debug!("Appending to MPD queue: {uri}");
        self.run(&["add", uri]).map(|_| ())
    }

    fn queue(&mut self) -> Result<QueueSnapshot, PlaybackError> {
        let status = self.run(&["status"])?;
        let status_text = String::from_utf8_lossy(&status.stdout);

        if let Some(size) = remaining_from_status(&status_text)? {
            return Ok(QueueSnapshot { size });
        }

        // Stopped: every queued entry is still ahead of us.
        let playlist = self.run(&["playlist"])?;
        let size = String::from_utf8_lossy(&playlist.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count();
        Ok(QueueSnapshot { size })
    }
}

/// Tracks left after the current one, from `mpc status` output.
///
/// The status line looks like `[playing] #3/10   0:32/3:45 (13%)`. Returns
/// `Ok(None)` when there is no such line (player stopped).
fn remaining_from_status(status: &str) -> Result<Option<usize>, PlaybackError> {
    let Some(line) = status
        .lines()
        .find(|line| line.starts_with("[playing]") || line.starts_with("[paused]"))
    else {
        return Ok(None);
    };

    let position = line
        .split_whitespace()
        .find_map(|token| token.strip_prefix('#'))
        .ok_or_else(|| PlaybackError::Malformed(line.to_string()))?;

    let (current, total) = position
        .split_once('/')
        .ok_or_else(|| PlaybackError::Malformed(line.to_string()))?;
    let current: usize = current
        .parse()
        .map_err(|_| PlaybackError::Malformed(line.to_string()))?;
    let total: usize = total
        .parse()
        .map_err(|_| PlaybackError::Malformed(line.to_string()))?;

    Ok(Some(total.saturating_sub(current)))
}

/// In-memory player: the first started track is "now playing", the rest and
/// anything enqueued wait in order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    now_playing: Option<String>,
    upcoming: Vec<String>,
    starts: usize,
    enqueues: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_playing(&self) -> Option<&str> {
        self.now_playing.as_deref()
    }

    pub fn upcoming(&self) -> &[String] {
        &self.upcoming
    }

    /// How many times playback was (re)started.
    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn enqueues(&self) -> usize {
        self.enqueues
    }

    /// Moves to the next queued track, as if the current one finished.
    pub fn advance(&mut self) -> Option<&str> {
        self.now_playing = if self.upcoming.is_empty() {
            None
        } else {
            Some(self.upcoming.remove(0))
        };
        self.now_playing()
    }
}

impl PlaybackSink for MemorySink {
    fn start_playback(&mut self, uris: &[String]) -> Result<(), PlaybackError> {
        self.starts += 1;
        let mut uris = uris.iter().cloned();
        self.now_playing = uris.next();
        self.upcoming = uris.collect();
        info!(
            "Dry run: playing {} with {} queued",
            self.now_playing.as_deref().unwrap_or("nothing"),
            self.upcoming.len()
        );
        Ok(())
    }

    fn enqueue(&mut self, uri: &str) -> Result<(), PlaybackError> {
        self.enqueues += 1;
        self.upcoming.push(uri.to_string());
        info!("Dry run: queued {uri}");
        Ok(())
    }

    fn queue(&mut self) -> Result<QueueSnapshot, PlaybackError> {
        Ok(QueueSnapshot {
            size: self.upcoming.len(),
        })
    }
}

//! # Queue Controller
//!
//! Keeps the remote playback queue in line with the confirmed emotion.
//!
//! ## Operations
//!
//! - **Switch**: on a confirmed change, fetch a fresh batch of tracks for the
//!   new emotion and restart playback with them. Whatever was queued before is
//!   replaced; nothing is ever appended.
//! - **Top-up**: while the emotion holds, read the queue length and, once it
//!   drops under the low-water mark, append enough tracks to reach the refill
//!   target. Never clears or reorders.
//!
//! Both are best-effort. [`QueueController::try_switch`] and
//! [`QueueController::try_top_up`] report exactly what happened;
//! the [`QueueActions`] implementation logs failures and carries on.

use log::{debug, info, warn};

use crate::config::SessionConfig;
use crate::emotion::EmotionLabel;
use crate::error::QueueError;
use crate::playback::PlaybackSink;
use crate::tracks::{Track, TrackProvider};

/// What the debouncer asks of the queue. Implementations must not fail.
pub trait QueueActions {
    fn switch(&mut self, emotion: EmotionLabel);
    fn top_up(&mut self, emotion: EmotionLabel);
}

/// Queue sizing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    pub low_water: usize,
    pub refill_target: usize,
    pub switch_batch: usize,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            low_water: 3,
            refill_target: 5,
            switch_batch: 10,
        }
    }
}

impl From<&SessionConfig> for QueuePolicy {
    fn from(config: &SessionConfig) -> Self {
        Self {
            low_water: config.low_water,
            refill_target: config.refill_target,
            switch_batch: config.switch_batch,
        }
    }
}

/// Result of a successful switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    /// References handed to the sink, in order.
    pub started: Vec<String>,
}

/// Result of a top-up attempt that reached the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUpOutcome {
    /// Queue was long enough; nothing requested.
    Sufficient { size: usize },
    Refilled {
        size: usize,
        requested: usize,
        appended: usize,
        failed: usize,
    },
}

#[derive(Debug)]
pub struct QueueController<P, S> {
    provider: P,
    sink: S,
    policy: QueuePolicy,
}

impl<P: TrackProvider, S: PlaybackSink> QueueController<P, S> {
    pub fn new(provider: P, sink: S) -> Self {
        Self::with_policy(provider, sink, QueuePolicy::default())
    }

    pub fn with_policy(provider: P, sink: S, policy: QueuePolicy) -> Self {
        Self {
            provider,
            sink,
            policy,
        }
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (P, S) {
        (self.provider, self.sink)
    }

    /// Replaces playback with up to `switch_batch` tracks for `emotion`.
    pub fn try_switch(&mut self, emotion: EmotionLabel) -> Result<SwitchOutcome, QueueError> {
        let tracks = self.provider.fetch_tracks(emotion, self.policy.switch_batch)?;
        let chosen = playable(&tracks);
        if chosen.is_empty() {
            return Err(QueueError::NoTracks(emotion));
        }

        info!("Chosen tracks for {emotion}: {}", track_names(&chosen));
        let uris: Vec<String> = chosen
            .iter()
            .filter_map(|track| track.playable_uri())
            .map(str::to_string)
            .collect();
        self.sink.start_playback(&uris)?;
        Ok(SwitchOutcome { started: uris })
    }

    /// Appends tracks for `emotion` if the queue is under the low-water mark.
    ///
    /// A failed append is logged and counted; the remaining tracks are still
    /// attempted.
    pub fn try_top_up(&mut self, emotion: EmotionLabel) -> Result<TopUpOutcome, QueueError> {
        let size = self.sink.queue()?.size;
        if size >= self.policy.low_water {
            debug!("Queue holds {size} tracks, no top-up needed");
            return Ok(TopUpOutcome::Sufficient { size });
        }

        let requested = self.policy.refill_target.saturating_sub(size);
        debug!("Queue holds {size} tracks, requesting {requested} more for {emotion}");

        let tracks = self.provider.fetch_tracks(emotion, requested)?;
        let chosen = playable(&tracks);
        if chosen.is_empty() {
            return Err(QueueError::NoTracks(emotion));
        }
        info!("Chosen tracks for {emotion}: {}", track_names(&chosen));

        let mut appended = 0;
        let mut failed = 0;
        for uri in chosen.iter().filter_map(|track| track.playable_uri()) {
            match self.sink.enqueue(uri) {
                Ok(()) => appended += 1,
                Err(e) => {
                    warn!("Failed to queue {uri}: {e}");
                    failed += 1;
                }
            }
        }

        Ok(TopUpOutcome::Refilled {
            size,
            requested,
            appended,
            failed,
        })
    }
}

impl<P: TrackProvider, S: PlaybackSink> QueueActions for QueueController<P, S> {
    fn switch(&mut self, emotion: EmotionLabel) {
        match self.try_switch(emotion) {
            Ok(outcome) => info!("Switched playback to {emotion} ({} tracks)", outcome.started.len()),
            Err(e) => warn!("Switch to {emotion} failed: {e}"),
        }
    }

    fn top_up(&mut self, emotion: EmotionLabel) {
        match self.try_top_up(emotion) {
            Ok(TopUpOutcome::Refilled { appended, failed, .. }) if failed > 0 => {
                warn!("Top-up for {emotion} queued {appended} tracks, {failed} failed")
            }
            Ok(TopUpOutcome::Refilled { appended, .. }) => {
                info!("Top-up for {emotion} queued {appended} tracks")
            }
            Ok(TopUpOutcome::Sufficient { .. }) => {}
            Err(e) => warn!("Top-up for {emotion} failed: {e}"),
        }
    }
}

/// Tracks the sink can actually play, in provider order.
fn playable(tracks: &[Track]) -> Vec<&Track> {
    tracks
        .iter()
        .filter(|track| track.playable_uri().is_some())
        .collect()
}

fn track_names(tracks: &[&Track]) -> String {
    tracks
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

//! Error kinds for the external collaborators.
//!
//! The session never lets these escape its frame loop; they exist so the
//! controller and its callers can tell "nothing found" apart from "service
//! unreachable" when deciding what to log.

use thiserror::Error;

/// The classifier failed on a frame. The frame counts as no detection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("classification failed: {0}")]
pub struct ClassificationError(pub String);

/// Track search or listing failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("track provider unreachable: {0}")]
    Unreachable(String),
    #[error("not found in catalog: {0}")]
    NotFound(String),
    /// The upstream response was missing a field or had the wrong shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// The playback service refused or could not run a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("playback service unavailable: {0}")]
    Unavailable(String),
    #[error("playback command `{command}` rejected: {reason}")]
    Rejected { command: String, reason: String },
    #[error("unreadable playback status: {0}")]
    Malformed(String),
}

/// Why a switch or top-up did nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("no playable tracks found for {0}")]
    NoTracks(crate::emotion::EmotionLabel),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

//! # Frames, Classification and Emission Cadence
//!
//! Frames are pulled one at a time from a [`FrameSource`]. Only every
//! `analysis_interval`-th frame is handed to the [`EmotionClassifier`]; the
//! smoothed label is emitted on its own, slower cadence
//! (`check_interval` frames), which is what [`EmissionCadence`] tracks.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::config::SessionConfig;
use crate::emotion::RawDetection;
use crate::error::ClassificationError;

/// Pull-based frame supplier. `None` means the source is exhausted.
pub trait FrameSource {
    type Frame;

    fn read_frame(&mut self) -> Option<Self::Frame>;
}

/// Turns a frame into a detection. `Ok(None)` (no face) is not an error.
pub trait EmotionClassifier<F> {
    fn classify(&mut self, frame: &F) -> Result<Option<RawDetection>, ClassificationError>;
}

impl<F, T> EmotionClassifier<F> for T
where
    T: FnMut(&F) -> Result<Option<RawDetection>, ClassificationError>,
{
    fn classify(&mut self, frame: &F) -> Result<Option<RawDetection>, ClassificationError> {
        self(frame)
    }
}

/// Frame and check counters.
#[derive(Debug, Clone)]
pub struct EmissionCadence {
    analysis_interval: u64,
    check_interval: u64,
    frames: u64,
    since_check: u64,
}

impl EmissionCadence {
    /// Zero intervals are treated as 1.
    pub fn new(analysis_interval: u64, check_interval: u64) -> Self {
        Self {
            analysis_interval: analysis_interval.max(1),
            check_interval: check_interval.max(1),
            frames: 0,
            since_check: 0,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.analysis_interval, config.check_interval)
    }

    /// Counts a new frame. Returns whether it should be classified.
    pub fn next_frame(&mut self) -> bool {
        self.frames += 1;
        self.since_check += 1;
        self.frames % self.analysis_interval == 0
    }

    /// Whether a label should be emitted now. The check counter only resets
    /// when something is emitted, so with no result yet it keeps counting and
    /// the first result is emitted straight away.
    pub fn check_due(&mut self, has_result: bool) -> bool {
        if self.since_check >= self.check_interval && has_result {
            self.since_check = 0;
            true
        } else {
            false
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for EmissionCadence {
    fn default() -> Self {
        Self::new(3, 30)
    }
}

/// One line of a frame script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ScriptLine {
    Failure { error: String },
    Detected(RawDetection),
}

/// A recorded classification stream, one frame per line.
///
/// Each non-empty line is a JSON detection object, `null` for a frame with no
/// face, or `{"error": "..."}` for a frame the classifier failed on. The frame
/// itself carries its classification, so the same value serves as both
/// [`FrameSource`] and [`EmotionClassifier`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedFrames {
    frames: VecDeque<ScriptedFrame>,
}

/// A frame from [`ScriptedFrames`], carrying its pre-recorded result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedFrame(Result<Option<RawDetection>, ClassificationError>);

impl ScriptedFrames {
    pub fn new(frames: impl IntoIterator<Item = Result<Option<RawDetection>, ClassificationError>>) -> Self {
        Self {
            frames: frames.into_iter().map(ScriptedFrame).collect(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut frames = VecDeque::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed: Option<ScriptLine> = serde_json::from_str(line)
                .with_context(|| format!("Invalid frame on line {}", index + 1))?;
            frames.push_back(ScriptedFrame(match parsed {
                None => Ok(None),
                Some(ScriptLine::Detected(detection)) => Ok(Some(detection)),
                Some(ScriptLine::Failure { error }) => Err(ClassificationError(error)),
            }));
        }
        Ok(Self { frames })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read frame script {}", path.display()))?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ScriptedFrames {
    type Frame = ScriptedFrame;

    fn read_frame(&mut self) -> Option<ScriptedFrame> {
        self.frames.pop_front()
    }
}

/// Classifier for [`ScriptedFrame`]s: replays what was recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedClassifier;

impl EmotionClassifier<ScriptedFrame> for ScriptedClassifier {
    fn classify(&mut self, frame: &ScriptedFrame) -> Result<Option<RawDetection>, ClassificationError> {
        frame.0.clone()
    }
}

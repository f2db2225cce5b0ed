//! # Emotion Labels and Detections
//!
//! The closed set of moods a classifier can report, plus the per-frame
//! detection record that flows from the classifier through the smoother.
//!
//! "No detection" is never a label: it is modelled as `Option::None`, either
//! for a whole frame (`Option<Detection>`) or for a detection whose dominant
//! label could not be read (`Detection::dominant == None`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the seven moods a face classifier reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    /// Every label, in classifier order.
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Angry,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }

    /// Parse a classifier string, treating anything unknown as no detection.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    /// Overlay colour for this mood as a BGR triple.
    pub fn color(self) -> (u8, u8, u8) {
        match self {
            EmotionLabel::Angry => (0, 0, 255),
            EmotionLabel::Disgust => (0, 255, 0),
            EmotionLabel::Fear => (128, 0, 128),
            EmotionLabel::Happy => (0, 255, 255),
            EmotionLabel::Sad => (255, 0, 0),
            EmotionLabel::Surprise => (255, 165, 0),
            EmotionLabel::Neutral => (128, 128, 128),
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a string is not one of the seven labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion label: {0:?}")]
pub struct UnknownLabel(pub String);

impl FromStr for EmotionLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == lowered)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Face bounding box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// A single classification result for one analysed frame.
///
/// The same shape is used before smoothing (`RawDetection`) and after
/// (`SmoothedDetection`): smoothing only rewrites `dominant`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    /// Dominant mood, `None` when the classifier gave no readable label.
    #[serde(default, alias = "dominant_emotion", deserialize_with = "lenient_label")]
    pub dominant: Option<EmotionLabel>,
    /// Per-label confidence in percent (0..=100).
    #[serde(default, alias = "emotion")]
    pub confidence: BTreeMap<EmotionLabel, f64>,
    #[serde(default)]
    pub region: Option<Region>,
}

pub type RawDetection = Detection;
pub type SmoothedDetection = Detection;

impl Detection {
    pub fn new(dominant: EmotionLabel) -> Self {
        Self {
            dominant: Some(dominant),
            ..Self::default()
        }
    }

    pub fn with_confidence(mut self, label: EmotionLabel, percent: f64) -> Self {
        self.confidence.insert(label, percent);
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Confidence of the dominant label, 0 when unknown.
    pub fn dominant_confidence(&self) -> f64 {
        self.dominant
            .and_then(|label| self.confidence.get(&label).copied())
            .unwrap_or(0.0)
    }

    /// Short overlay text such as `HAPPY (87.3%)`, or `None` without a label.
    pub fn describe(&self) -> Option<String> {
        let label = self.dominant?;
        Some(format!(
            "{} ({:.1}%)",
            label.as_str().to_ascii_uppercase(),
            self.dominant_confidence()
        ))
    }
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<EmotionLabel>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(EmotionLabel::parse_lenient))
}

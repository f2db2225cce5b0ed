//! Rolling-window majority vote over recent dominant labels.

use std::collections::VecDeque;

use crate::emotion::{EmotionLabel, RawDetection, SmoothedDetection};

/// Bounded FIFO of the most recent dominant labels.
#[derive(Debug, Clone)]
pub struct EmotionSmoother {
    window: VecDeque<EmotionLabel>,
    capacity: usize,
}

impl EmotionSmoother {
    /// A zero capacity is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Labels currently in the window, oldest first.
    pub fn window(&self) -> impl Iterator<Item = EmotionLabel> + '_ {
        self.window.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Records `raw.dominant` and returns `raw` with the window's majority
    /// label as its dominant label.
    ///
    /// A missing detection, or one without a dominant label, is returned as-is
    /// and leaves the window untouched.
    pub fn push_and_smooth(&mut self, raw: Option<RawDetection>) -> Option<SmoothedDetection> {
        let mut detection = raw?;
        let Some(label) = detection.dominant else {
            return Some(detection);
        };

        self.window.push_back(label);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        detection.dominant = self.majority();
        Some(detection)
    }

    /// Most frequent label in the window. Ties go to whichever label appears
    /// first in the window.
    pub fn majority(&self) -> Option<EmotionLabel> {
        let mut counts: Vec<(EmotionLabel, usize)> = Vec::with_capacity(EmotionLabel::ALL.len());
        for label in &self.window {
            match counts.iter_mut().find(|(seen, _)| seen == label) {
                Some((_, count)) => *count += 1,
                None => counts.push((*label, 1)),
            }
        }

        counts
            .into_iter()
            .fold(None, |best: Option<(EmotionLabel, usize)>, (label, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((label, count)),
            })
            .map(|(label, _)| label)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

impl Default for EmotionSmoother {
    fn default() -> Self {
        Self::new(5)
    }
}

//! # Stability Debouncer
//!
//! A label has to arrive `threshold` times in a row before it replaces the
//! confirmed emotion. Any interrupting label restarts the run at 1, and a
//! label matching the confirmed emotion clears the candidate entirely.
//!
//! The machine is purely reactive: no timers, no decay. It is driven by
//! [`StabilityDebouncer::update`], which also tells the queue what to do:
//! a stable repeat tops the queue up, a confirmed change switches it.

use log::{debug, info};

use crate::emotion::EmotionLabel;
use crate::queue::QueueActions;

/// Confirmed emotion plus the candidate currently building up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilityState {
    pub confirmed: Option<EmotionLabel>,
    pub pending: Option<EmotionLabel>,
    pub pending_count: u32,
}

impl StabilityState {
    /// Starts already settled on `confirmed`.
    pub fn confirmed(label: EmotionLabel) -> Self {
        Self {
            confirmed: Some(label),
            ..Self::default()
        }
    }

    fn clear_pending(&mut self) {
        self.pending = None;
        self.pending_count = 0;
    }
}

/// What a single observation did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same as the confirmed emotion.
    Stable(EmotionLabel),
    /// Candidate run is `count` long, not yet enough.
    Pending { label: EmotionLabel, count: u32 },
    /// `to` is now the confirmed emotion.
    Confirmed {
        from: Option<EmotionLabel>,
        to: EmotionLabel,
    },
}

#[derive(Debug, Clone)]
pub struct StabilityDebouncer {
    state: StabilityState,
    threshold: u32,
}

impl StabilityDebouncer {
    /// A zero threshold is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self::with_state(threshold, StabilityState::default())
    }

    pub fn with_state(threshold: u32, state: StabilityState) -> Self {
        Self {
            state,
            threshold: threshold.max(1),
        }
    }

    pub fn state(&self) -> &StabilityState {
        &self.state
    }

    pub fn confirmed(&self) -> Option<EmotionLabel> {
        self.state.confirmed
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Advances the state machine without touching the queue.
    pub fn observe(&mut self, detected: EmotionLabel) -> Transition {
        if self.state.confirmed == Some(detected) {
            self.state.clear_pending();
            return Transition::Stable(detected);
        }

        if self.state.pending == Some(detected) {
            self.state.pending_count += 1;
        } else {
            self.state.pending = Some(detected);
            self.state.pending_count = 1;
        }

        if self.state.pending_count >= self.threshold {
            let from = self.state.confirmed.replace(detected);
            self.state.clear_pending();
            return Transition::Confirmed { from, to: detected };
        }

        Transition::Pending {
            label: detected,
            count: self.state.pending_count,
        }
    }

    /// Feeds one emitted label and drives the queue accordingly.
    ///
    /// Returns `true` only when this call confirms a change. The confirmed
    /// emotion is updated before the queue is switched and is not rolled back
    /// if the switch does nothing.
    pub fn update<Q: QueueActions + ?Sized>(&mut self, detected: EmotionLabel, queue: &mut Q) -> bool {
        matches!(self.apply(detected, queue), Transition::Confirmed { .. })
    }

    /// [`update`](Self::update), returning the full transition.
    pub fn apply<Q: QueueActions + ?Sized>(&mut self, detected: EmotionLabel, queue: &mut Q) -> Transition {
        let transition = self.observe(detected);
        match transition {
            Transition::Stable(label) => {
                debug!("Emotion {label} stable, checking queue");
                queue.top_up(label);
            }
            Transition::Pending { label, count } => {
                debug!("Emotion {label} pending ({count}/{})", self.threshold);
            }
            Transition::Confirmed { from, to } => {
                match from {
                    Some(from) => info!("Emotion changed: {from} -> {to}"),
                    None => info!("Emotion confirmed: {to}"),
                }
                queue.switch(to);
            }
        }
        transition
    }
}

impl Default for StabilityDebouncer {
    fn default() -> Self {
        Self::new(3)
    }
}

//! # Mood Session
//!
//! Owns the whole control loop for one viewer: the smoothing window, the
//! stability state, the emission cadence and the queue it steers.
//!
//! ## Per-frame pipeline
//!
//! ```text
//! read frame → (every Nth) classify → smooth → keep latest result
//!            → (every Mth, once a result exists) emit label
//!            → debouncer.update(label) → queue switch / top-up
//! ```
//!
//! Everything runs to completion on the calling thread before the next frame
//! is read, so labels reach the debouncer strictly in frame order and at most
//! one queue operation is ever in flight. Classification, provider and
//! playback failures are logged and absorbed; [`MoodSession::run`] never
//! fails.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::debounce::{StabilityDebouncer, StabilityState, Transition};
use crate::emotion::{EmotionLabel, RawDetection, SmoothedDetection};
use crate::queue::QueueActions;
use crate::smoother::EmotionSmoother;
use crate::source::{EmissionCadence, EmotionClassifier, FrameSource};

/// Cloneable flag that ends [`MoodSession::run`] before the next frame.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Something observable that happened while processing a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The classifier failed; the frame counted as no detection.
    ClassificationFailed(String),
    /// The cadence fired and this label went to the debouncer.
    Emitted(EmotionLabel),
    /// The debouncer accepted a new emotion.
    Confirmed {
        from: Option<EmotionLabel>,
        to: EmotionLabel,
    },
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub frames: u64,
    pub classified: u64,
    pub classification_errors: u64,
    pub emitted: u64,
    pub changes: u64,
    pub confirmed: Option<EmotionLabel>,
    pub stopped: bool,
}

/// One viewer's control loop, generic over what it drives.
#[derive(Debug)]
pub struct MoodSession<Q> {
    smoother: EmotionSmoother,
    debouncer: StabilityDebouncer,
    cadence: EmissionCadence,
    latest: Option<SmoothedDetection>,
    queue: Q,
    stop: StopHandle,
}

impl<Q: QueueActions> MoodSession<Q> {
    pub fn new(config: &SessionConfig, queue: Q) -> Self {
        Self::with_parts(
            EmotionSmoother::new(config.window_capacity),
            StabilityDebouncer::new(config.stability_threshold),
            EmissionCadence::from_config(config),
            queue,
        )
    }

    /// Builds a session from explicitly constructed state.
    pub fn with_parts(
        smoother: EmotionSmoother,
        debouncer: StabilityDebouncer,
        cadence: EmissionCadence,
        queue: Q,
    ) -> Self {
        Self {
            smoother,
            debouncer,
            cadence,
            latest: None,
            queue,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> &StabilityState {
        self.debouncer.state()
    }

    pub fn confirmed(&self) -> Option<EmotionLabel> {
        self.debouncer.confirmed()
    }

    pub fn smoother(&self) -> &EmotionSmoother {
        &self.smoother
    }

    /// Latest smoothed detection, kept across frames without detections.
    pub fn latest(&self) -> Option<&SmoothedDetection> {
        self.latest.as_ref()
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn into_queue(self) -> Q {
        self.queue
    }

    /// Smooths one classifier result and remembers it if it has a label.
    pub fn record_detection(&mut self, raw: Option<RawDetection>) {
        if let Some(smoothed) = self.smoother.push_and_smooth(raw) {
            if let Some(text) = smoothed.describe() {
                debug!("Smoothed detection: {text}");
                self.latest = Some(smoothed);
            }
        }
    }

    /// Hands one emitted label to the debouncer. Returns `true` on a
    /// confirmed change.
    pub fn update(&mut self, label: EmotionLabel) -> bool {
        self.debouncer.update(label, &mut self.queue)
    }

    /// Runs until the source is exhausted or the stop handle fires.
    pub fn run<S, C>(&mut self, source: &mut S, classifier: &mut C) -> SessionReport
    where
        S: FrameSource,
        C: EmotionClassifier<S::Frame>,
    {
        self.run_with_observer(source, classifier, |_| {})
    }

    /// Like [`run`](Self::run), reporting each [`SessionEvent`] in order.
    pub fn run_with_observer<S, C, F>(
        &mut self,
        source: &mut S,
        classifier: &mut C,
        mut observer: F,
    ) -> SessionReport
    where
        S: FrameSource,
        C: EmotionClassifier<S::Frame>,
        F: FnMut(&SessionEvent),
    {
        let mut report = SessionReport::default();
        info!("Mood session started");

        loop {
            if self.stop.is_stopped() {
                info!("Mood session stopped");
                report.stopped = true;
                break;
            }
            let Some(frame) = source.read_frame() else {
                debug!("Frame source exhausted");
                break;
            };
            report.frames += 1;

            if self.cadence.next_frame() {
                report.classified += 1;
                match classifier.classify(&frame) {
                    Ok(raw) => self.record_detection(raw),
                    Err(e) => {
                        warn!("{e}");
                        report.classification_errors += 1;
                        observer(&SessionEvent::ClassificationFailed(e.0));
                    }
                }
            }

            let label = self.latest.as_ref().and_then(|d| d.dominant);
            if !self.cadence.check_due(label.is_some()) {
                continue;
            }
            let Some(label) = label else { continue };

            info!("Detected emotion: {label}");
            report.emitted += 1;
            observer(&SessionEvent::Emitted(label));

            let from = self.debouncer.confirmed();
            if self.update(label) {
                report.changes += 1;
                observer(&SessionEvent::Confirmed { from, to: label });
            }
        }

        report.confirmed = self.debouncer.confirmed();
        info!(
            "Mood session ended after {} frames, {} labels, {} changes",
            report.frames, report.emitted, report.changes
        );
        report
    }

    /// Feeds labels straight to the debouncer, bypassing frames and cadence.
    pub fn replay_labels<I>(&mut self, labels: I) -> Vec<Transition>
    where
        I: IntoIterator<Item = EmotionLabel>,
    {
        labels
            .into_iter()
            .map(|label| self.debouncer.apply(label, &mut self.queue))
            .collect()
    }
}

//! Labeling session: capture a frame, let a human label it, record it.
//!
//! The session alternates between `Live` (frames flow in and the newest one
//! is kept) and `Captured` (the newest frame is frozen and waits for a
//! label). Calls that do not fit the current state are no-ops reported as
//! values, never errors; the workflow is driven by a UI and double clicks
//! or early clicks are expected.

use crate::core::dataset::{ClassCounts, Dataset, Label, LabeledRecord};
use crate::core::features::{FeatureExtractor, FeatureUnavailable, FeatureVector};
use crate::source::types::LandmarkFrame;
use serde::{Deserialize, Serialize};

/// Where the session is in the capture/label cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Live,
    Captured,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Live => write!(f, "live"),
            SessionState::Captured => write!(f, "captured"),
        }
    }
}

/// Result of a [`LabelingSession::label`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelOutcome {
    /// A record was appended at `index`
    Recorded {
        index: usize,
        features: FeatureVector,
    },
    /// The session was not in the captured state
    NotCaptured,
    /// No face has been seen yet; the session stays captured
    NoActiveCapture,
    /// The captured frame has no usable features; the session stays captured
    FeatureUnavailable(FeatureUnavailable),
}

impl LabelOutcome {
    /// Whether a record was appended to the dataset.
    pub fn is_recorded(&self) -> bool {
        matches!(self, LabelOutcome::Recorded { .. })
    }
}

/// Collects labeled training records from a live frame stream.
#[derive(Debug, Clone)]
pub struct LabelingSession {
    extractor: FeatureExtractor,
    state: SessionState,
    current: Option<LandmarkFrame>,
    dataset: Dataset,
    counts: ClassCounts,
}

impl LabelingSession {
    /// Start a session in [`SessionState::Live`] with an empty dataset.
    pub fn new(extractor: FeatureExtractor) -> Self {
        Self {
            extractor,
            state: SessionState::Live,
            current: None,
            dataset: Dataset::new(),
            counts: ClassCounts::default(),
        }
    }

    /// Continue appending to an existing dataset.
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.counts = dataset.counts();
        self.dataset = dataset;
        self
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Extractor applied to captured frames.
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Records labeled so far, per class.
    pub fn counts(&self) -> ClassCounts {
        self.counts
    }

    /// Records labeled so far.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// End the session and keep its records.
    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    /// Whether a face has been seen since the session started.
    pub fn has_frame(&self) -> bool {
        self.current.is_some()
    }

    /// Offer a new frame. Returns false if it was dropped because a frame is
    /// currently captured.
    pub fn on_frame(&mut self, frame: LandmarkFrame) -> bool {
        match self.state {
            SessionState::Live => {
                self.current = Some(frame);
                true
            }
            SessionState::Captured => false,
        }
    }

    /// Freeze the current frame. Returns false if already captured.
    pub fn capture(&mut self) -> bool {
        if self.state == SessionState::Captured {
            return false;
        }
        self.state = SessionState::Captured;
        tracing::debug!(has_frame = self.current.is_some(), "frame captured");
        true
    }

    /// Label the captured frame and return to live.
    pub fn label(&mut self, label: Label) -> LabelOutcome {
        if self.state != SessionState::Captured {
            return LabelOutcome::NotCaptured;
        }

        let Some(frame) = self.current.as_ref() else {
            tracing::debug!(%label, "label ignored, no face seen yet");
            return LabelOutcome::NoActiveCapture;
        };

        let features = match self.extractor.extract(frame) {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(%label, error = %e, "captured frame has no usable features");
                return LabelOutcome::FeatureUnavailable(e);
            }
        };

        self.dataset.push(LabeledRecord { label, features });
        self.counts.increment(label);
        self.state = SessionState::Live;

        let index = self.dataset.len() - 1;
        tracing::debug!(
            %label,
            index,
            focused = self.counts.focused,
            distracted = self.counts.distracted,
            "record labeled"
        );
        LabelOutcome::Recorded { index, features }
    }

    /// Leave the captured state without recording. Returns false if live.
    pub fn discard(&mut self) -> bool {
        if self.state != SessionState::Captured {
            return false;
        }
        self.state = SessionState::Live;
        true
    }
}

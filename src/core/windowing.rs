//! Windowed aggregation of per-frame scores into attention decisions.
//!
//! A single frame's score is noisy (landmark jitter, blinks, brief glances).
//! Scores are collected into a window of `W` samples and only the window
//! mean is turned into a decision. In the default tumbling mode the window
//! is flushed after every decision, so consecutive decisions never share
//! samples.

use crate::core::features::{FeatureExtractor, FeatureUnavailable};
use crate::core::scoring::{ScoreError, Scorer};
use crate::source::types::LandmarkFrame;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use thiserror::Error;

/// Default number of scores per decision.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Window means strictly above this are classified as distracted.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Stabilized attention state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Focused,
    Distracted,
}

impl Decision {
    /// Classify a window mean. Ties go to `Focused`.
    pub fn from_mean(mean: f64, threshold: f64) -> Self {
        if mean > threshold {
            Decision::Distracted
        } else {
            Decision::Focused
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Focused => write!(f, "focused"),
            Decision::Distracted => write!(f, "distracted"),
        }
    }
}

/// How the window advances after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Non-overlapping windows, cleared after each decision
    #[default]
    Tumbling,
    /// Once full, every new score evicts the oldest and yields a decision
    Sliding,
}

/// Bounded, ordered buffer of recent scores.
#[derive(Debug, Clone)]
pub struct ScoreHistory {
    scores: VecDeque<f64>,
    capacity: usize,
}

impl ScoreHistory {
    /// Create a history holding up to `capacity` scores (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            scores: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a score, evicting the oldest when full.
    pub fn push(&mut self, score: f64) {
        if self.scores.len() == self.capacity {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
    }

    /// Whether the window holds `capacity` scores.
    pub fn is_full(&self) -> bool {
        self.scores.len() >= self.capacity
    }

    /// Scores currently held.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no score is held.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Window size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every held score.
    pub fn clear(&mut self) {
        self.scores.clear();
    }

    /// Arithmetic mean, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        Some(self.scores.iter().sum::<f64>() / self.scores.len() as f64)
    }

    /// Sample standard deviation (0 for fewer than two scores).
    pub fn std_dev(&self) -> f64 {
        if self.scores.len() < 2 {
            return 0.0;
        }
        self.scores.iter().std_dev()
    }

    /// Scores from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.scores.iter()
    }
}

/// Summary of the window behind the most recent decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    /// Class chosen for the window
    pub decision: Decision,
    /// Mean score of the window
    pub mean_score: f64,
    /// Sample standard deviation of the window's scores
    pub std_dev: f64,
    /// Number of scores in the window
    pub samples: usize,
}

/// Why `submit` could not use a frame.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("no scoring model is loaded")]
    ClassifierUnavailable,
    #[error("frame skipped: {0}")]
    Feature(#[from] FeatureUnavailable),
    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoreError),
}

/// Turns a stream of frames into windowed attention decisions.
pub struct TemporalClassifier {
    extractor: FeatureExtractor,
    scorer: Option<Box<dyn Scorer>>,
    history: ScoreHistory,
    mode: WindowMode,
    threshold: f64,
    last_window: Option<WindowSummary>,
}

impl TemporalClassifier {
    /// Create a classifier with the default threshold and tumbling windows.
    pub fn new(extractor: FeatureExtractor, window_size: usize) -> Self {
        Self {
            extractor,
            scorer: None,
            history: ScoreHistory::new(window_size),
            mode: WindowMode::default(),
            threshold: DEFAULT_DECISION_THRESHOLD,
            last_window: None,
        }
    }

    /// Use `scorer` for per-frame scores.
    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Choose tumbling or sliding windows.
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    /// Means strictly above `threshold` are distracted.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Install or replace the scoring model.
    pub fn set_scorer(&mut self, scorer: Box<dyn Scorer>) {
        self.scorer = Some(scorer);
    }

    /// Whether a scorer is loaded.
    pub fn is_ready(&self) -> bool {
        self.scorer.is_some()
    }

    /// Extractor applied before scoring.
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Scores in the current window.
    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }

    /// Window mode in use.
    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    /// Decision threshold in use.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Summary of the window behind the last decision.
    pub fn last_window(&self) -> Option<&WindowSummary> {
        self.last_window.as_ref()
    }

    pub fn last_mean_score(&self) -> Option<f64> {
        self.last_window.map(|w| w.mean_score)
    }

    /// Extract, score and accumulate one frame.
    ///
    /// Returns `Ok(None)` while the window is still filling. Frames that
    /// cannot be featurized or scored leave the history untouched.
    pub fn submit(&mut self, frame: &LandmarkFrame) -> Result<Option<Decision>, ClassifyError> {
        let scorer = self
            .scorer
            .as_ref()
            .ok_or(ClassifyError::ClassifierUnavailable)?;

        let features = self.extractor.extract(frame)?;
        let score = scorer.score(&features)?;
        self.submit_score(score)
    }

    /// Accumulate a score computed elsewhere.
    ///
    /// Non-finite scores are rejected; finite ones are clamped into [0,1].
    pub fn submit_score(&mut self, score: f64) -> Result<Option<Decision>, ClassifyError> {
        if !score.is_finite() {
            return Err(ClassifyError::Scoring(ScoreError::NonFinite));
        }

        self.history.push(score.clamp(0.0, 1.0));
        if !self.history.is_full() {
            return Ok(None);
        }

        let Some(mean_score) = self.history.mean() else {
            return Ok(None);
        };
        let decision = Decision::from_mean(mean_score, self.threshold);
        let summary = WindowSummary {
            decision,
            mean_score,
            std_dev: self.history.std_dev(),
            samples: self.history.len(),
        };
        tracing::debug!(
            %decision,
            mean = summary.mean_score,
            std_dev = summary.std_dev,
            samples = summary.samples,
            "window decided"
        );
        self.last_window = Some(summary);

        if self.mode == WindowMode::Tumbling {
            self.history.clear();
        }

        Ok(Some(decision))
    }

    /// Drop any partially filled window.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_window = None;
    }
}

impl std::fmt::Debug for TemporalClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalClassifier")
            .field("scorer", &self.scorer.as_ref().map(|s| s.name().to_string()))
            .field("history", &self.history)
            .field("mode", &self.mode)
            .field("threshold", &self.threshold)
            .finish()
    }
}

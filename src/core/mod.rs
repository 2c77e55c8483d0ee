//! Core gaze-attention logic.
//!
//! This module contains:
//! - Feature extraction from facial landmarks
//! - Per-frame scoring and windowed classification
//! - The labeling session and dataset format used for training data

pub mod dataset;
pub mod features;
pub mod labeling;
pub mod pipeline;
pub mod scoring;
pub mod windowing;

// Re-export commonly used types
pub use dataset::{ClassCounts, Dataset, DatasetError, Label, LabeledRecord};
pub use features::{
    DegeneratePolicy, EyeProfile, EyeRegion, EyeRegions, FeatureExtractor, FeatureUnavailable,
    FeatureVector, FEATURE_LEN,
};
pub use labeling::{LabelOutcome, LabelingSession, SessionState};
pub use pipeline::{GazePipeline, LiveInference, PipelineEvent, Unavailable};
pub use scoring::{DenseNetwork, FnScorer, ScoreError, Scorer};
pub use windowing::{
    ClassifyError, Decision, ScoreHistory, TemporalClassifier, WindowMode, WindowSummary,
    DEFAULT_DECISION_THRESHOLD, DEFAULT_WINDOW_SIZE,
};

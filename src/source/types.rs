//! Landmark frame and input event types.
//!
//! A frame is whatever the upstream face-mesh detector produced for a single
//! video frame: an ordered, fixed-length list of normalized points. Nothing
//! here knows how the detector works.

use crate::core::dataset::Label;
use serde::{Deserialize, Serialize};

/// A single normalized facial keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    /// Horizontal position, normalized to the detector's input width
    pub x: f64,
    /// Vertical position, normalized to the detector's input height
    pub y: f64,
    /// Relative depth (0 when the detector does not supply one)
    #[serde(default)]
    pub z: f64,
}

impl LandmarkPoint {
    /// Point on the image plane with no depth.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Whether both image-plane coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One detector result for one video frame.
///
/// Immutable once produced; the core only ever reads from it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Points in the detector's stable index order
    pub landmarks: Vec<LandmarkPoint>,
    /// Capture time in milliseconds, if the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl LandmarkFrame {
    /// Frame without a timestamp.
    pub fn new(landmarks: Vec<LandmarkPoint>) -> Self {
        Self {
            landmarks,
            timestamp_ms: None,
        }
    }

    /// Attach a capture time in milliseconds.
    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Look up a landmark by detector index.
    pub fn point(&self, index: usize) -> Option<&LandmarkPoint> {
        self.landmarks.get(index)
    }

    /// Number of landmarks.
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// Whether the detector produced no landmarks.
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// One line of the newline-delimited JSON input stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// A detector result for one frame
    Frame(LandmarkFrame),
    /// The detector ran but found no face
    NoFace,
    /// Freeze the current frame for labeling
    Capture,
    /// Label the captured frame
    Label { label: Label },
    /// Leave the captured state without recording anything
    Discard,
    /// Write the dataset collected so far
    Export,
}

impl InputEvent {
    /// Parse a single input line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(serde_json::from_str(trimmed))
    }

    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::Frame(_) => "frame",
            InputEvent::NoFace => "no_face",
            InputEvent::Capture => "capture",
            InputEvent::Label { .. } => "label",
            InputEvent::Discard => "discard",
            InputEvent::Export => "export",
        }
    }
}

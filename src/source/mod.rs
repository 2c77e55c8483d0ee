//! Landmark input for the Gaze Focus Agent.
//!
//! The face-mesh detector is an external collaborator. This module only
//! defines the frame shape it hands over, and a line-oriented reader that
//! stands in for the detector callback when running from the command line.

pub mod reader;
pub mod throttle;
pub mod types;

// Re-export commonly used types
pub use reader::{parse_events, FrameReader, InputSource, SourceError, SourceMessage};
pub use throttle::FrameThrottle;
pub use types::{InputEvent, LandmarkFrame, LandmarkPoint};

//! Gaze Focus Agent - attention classification from facial landmarks.
//!
//! This library turns a stream of face-mesh landmark frames into a
//! stabilized focused/distracted signal, and collects human-labeled gaze
//! features for training the per-frame scoring model.
//!
//! # Privacy Guarantees
//!
//! - **No images**: The agent only ever receives landmark coordinates
//! - **No raw landmarks stored**: Frames are dropped once featurized
//! - **Minimal records**: A training record is one label and 4 gaze ratios
//! - **Transparency**: Everything the agent does is counted and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       Gaze Focus Agent                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐     │
//! │  │ FrameReader │──▶│  Features   │──▶│ Scorer + Window  │──▶ decision
//! │  │   (JSONL)   │   │ (iris/box)  │   │ (mean of W)      │     │
//! │  └─────────────┘   └─────────────┘   └──────────────────┘     │
//! │         │                 │                                   │
//! │         ▼                 ▼                                   │
//! │  ┌─────────────┐   ┌─────────────┐                            │
//! │  │Transparency │   │  Labeling   │──▶ dataset.json            │
//! │  │    Log      │   │  Session    │                            │
//! │  └─────────────┘   └─────────────┘                            │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gaze_focus_agent::core::{FeatureExtractor, TemporalClassifier, DenseNetwork, GazePipeline, LiveInference};
//! use gaze_focus_agent::source::{FrameReader, InputEvent, InputSource};
//! use std::path::Path;
//!
//! let model = DenseNetwork::load(Path::new("model.json")).expect("model");
//! let classifier = TemporalClassifier::new(FeatureExtractor::default(), 20)
//!     .with_scorer(Box::new(model));
//! let mut live = LiveInference::new(classifier);
//!
//! let mut reader = FrameReader::new(InputSource::Stdin);
//! reader.start().expect("reader");
//! while let Ok(Ok(InputEvent::Frame(frame))) = reader.receiver().recv() {
//!     println!("{:?}", live.on_frame(frame));
//! }
//! ```

pub mod config;
pub mod core;
pub mod source;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, DetectorOptions};
pub use core::{
    Dataset, Decision, FeatureExtractor, FeatureVector, GazePipeline, Label, LabelingSession,
    LiveInference, TemporalClassifier,
};
pub use source::{FrameReader, InputEvent, InputSource, LandmarkFrame, LandmarkPoint};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║             GAZE FOCUS AGENT - PRIVACY DECLARATION               ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent estimates attention from where your eyes point.      ║
║                                                                  ║
║  ✓ WHAT WE USE:                                                  ║
║    • Face-mesh landmark positions, one frame at a time           ║
║    • Iris position relative to each eye (4 numbers per frame)    ║
║    • Labels you assign yourself during a labeling session        ║
║                                                                  ║
║  ✗ WHAT WE NEVER KEEP:                                           ║
║    • Camera images or video                                      ║
║    • Raw landmark coordinates (your face geometry)               ║
║    • Any identity information                                    ║
║                                                                  ║
║  All processing is local. A saved training record contains      ║
║  only a label and 4 gaze ratios.                                 ║
║                                                                  ║
║  You can view processing statistics anytime with:                ║
║    gaze-focus status                                             ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

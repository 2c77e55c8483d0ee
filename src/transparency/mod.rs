//! Transparency module for the gaze focus agent.
//!
//! Tracks and exposes what the agent did with the landmark stream so a
//! user can check that nothing beyond gaze ratios is retained.

pub mod log;

pub use log::{
    create_shared_log, create_shared_log_with_persistence, Counter, CounterValues,
    SharedTransparencyLog, TransparencyLog, TransparencyStats,
};

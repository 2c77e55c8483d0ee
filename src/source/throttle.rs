//! Frame-rate cap for the capture loop.
//!
//! Decisions are averaged over whole windows, so running the core faster
//! than roughly 30 Hz buys nothing. The throttle lives on the capture side;
//! the core itself never drops frames for rate reasons.

use crate::source::types::LandmarkFrame;
use std::time::Duration;

/// Drops frames that arrive closer together than a minimum interval.
///
/// Frames without a timestamp always pass.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    min_interval_ms: u64,
    last_accepted_ms: Option<u64>,
}

impl FrameThrottle {
    /// Drop frames closer together than `min_interval`. Zero disables the cap.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval_ms: min_interval.as_millis() as u64,
            last_accepted_ms: None,
        }
    }

    /// A throttle that accepts every frame.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns true if the frame should be processed.
    pub fn accept(&mut self, frame: &LandmarkFrame) -> bool {
        let Some(ts) = frame.timestamp_ms else {
            return true;
        };

        if self.min_interval_ms == 0 {
            self.last_accepted_ms = Some(ts);
            return true;
        }

        match self.last_accepted_ms {
            // Timestamps going backwards mean the source restarted
            Some(last) if ts >= last && ts - last < self.min_interval_ms => false,
            _ => {
                self.last_accepted_ms = Some(ts);
                true
            }
        }
    }

    /// Forget the last accepted frame.
    pub fn reset(&mut self) {
        self.last_accepted_ms = None;
    }
}

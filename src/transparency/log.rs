//! Privacy-preserving transparency log.
//!
//! Counts what the agent did with the landmark stream: how many frames it
//! saw, dropped or skipped, what it decided and how many training records
//! it wrote. Only counts are kept, never landmark values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Something the log counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    FramesReceived,
    FramesDropped,
    FramesSkipped,
    NoFaceFrames,
    MalformedLines,
    DecisionsFocused,
    DecisionsDistracted,
    RecordsLabeled,
    DatasetsExported,
}

impl Counter {
    const COUNT: usize = 9;

    const ALL: [Counter; Self::COUNT] = [
        Counter::FramesReceived,
        Counter::FramesDropped,
        Counter::FramesSkipped,
        Counter::NoFaceFrames,
        Counter::MalformedLines,
        Counter::DecisionsFocused,
        Counter::DecisionsDistracted,
        Counter::RecordsLabeled,
        Counter::DatasetsExported,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Session-wide counters, safe to share across threads.
#[derive(Debug)]
pub struct TransparencyLog {
    counters: [AtomicU64; Counter::COUNT],
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a log with all counters at zero and no persistence.
    pub fn new() -> Self {
        Self {
            counters: Default::default(),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that restores and saves its counters at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "could not load previous transparency stats");
        }

        log
    }

    /// Increment `counter` by one.
    pub fn record(&self, counter: Counter) {
        self.record_many(counter, 1);
    }

    /// Increment `counter` by `count`.
    pub fn record_many(&self, counter: Counter, count: u64) {
        self.counters[counter.slot()].fetch_add(count, Ordering::Relaxed);
    }

    /// Current value of `counter`.
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.slot()].load(Ordering::Relaxed)
    }

    /// Snapshot of all counters and the session duration.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            counts: self.counts(),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    fn counts(&self) -> CounterValues {
        CounterValues {
            frames_received: self.get(Counter::FramesReceived),
            frames_dropped: self.get(Counter::FramesDropped),
            frames_skipped: self.get(Counter::FramesSkipped),
            no_face_frames: self.get(Counter::NoFaceFrames),
            malformed_lines: self.get(Counter::MalformedLines),
            decisions_focused: self.get(Counter::DecisionsFocused),
            decisions_distracted: self.get(Counter::DecisionsDistracted),
            records_labeled: self.get(Counter::RecordsLabeled),
            datasets_exported: self.get(Counter::DatasetsExported),
        }
    }

    /// Human-readable summary for the `status` command and shutdown.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let c = &stats.counts;
        format!(
            "Session Statistics:\n\
             - Frames received: {}\n\
             - Frames dropped (throttled or while captured): {}\n\
             - Frames without usable gaze features: {}\n\
             - Frames with no face: {}\n\
             - Malformed input lines: {}\n\
             - Decisions: {} focused, {} distracted\n\
             - Records labeled: {}\n\
             - Datasets exported: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No images or video frames received\n\
             - No raw landmark coordinates stored\n\
             - Only 4 gaze ratios per labeled record retained",
            c.frames_received,
            c.frames_dropped,
            c.frames_skipped,
            c.no_face_frames,
            c.malformed_lines,
            c.decisions_focused,
            c.decisions_distracted,
            c.records_labeled,
            c.datasets_exported,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk, if persistence is enabled.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let persisted = PersistedStats {
            counts: self.counts(),
            last_updated: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        let Some(path) = self.persist_path.as_ref().filter(|p| p.exists()) else {
            return Ok(());
        };

        let content = std::fs::read_to_string(path)?;
        let persisted: PersistedStats =
            serde_json::from_str(&content).map_err(std::io::Error::other)?;

        let c = persisted.counts;
        let restored = [
            c.frames_received,
            c.frames_dropped,
            c.frames_skipped,
            c.no_face_frames,
            c.malformed_lines,
            c.decisions_focused,
            c.decisions_distracted,
            c.records_labeled,
            c.datasets_exported,
        ];
        for (counter, value) in Counter::ALL.iter().zip(restored) {
            self.counters[counter.slot()].store(value, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Set every counter back to zero.
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterValues {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub frames_skipped: u64,
    pub no_face_frames: u64,
    pub malformed_lines: u64,
    pub decisions_focused: u64,
    pub decisions_distracted: u64,
    pub records_labeled: u64,
    pub datasets_exported: u64,
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    /// Counter values at snapshot time
    #[serde(flatten)]
    pub counts: CounterValues,
    /// When this process started counting
    pub session_start: DateTime<Utc>,
    /// Seconds since `session_start`
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    #[serde(flatten)]
    counts: CounterValues,
    last_updated: DateTime<Utc>,
}

/// A log shared between the frame loop and reporting.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Shared log without persistence.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Shared log restored from and saved to `path`.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparency_log_counting() {
        let log = TransparencyLog::new();

        log.record(Counter::FramesReceived);
        log.record(Counter::FramesReceived);
        log.record(Counter::DecisionsDistracted);
        log.record_many(Counter::FramesDropped, 5);

        let stats = log.stats();
        assert_eq!(stats.counts.frames_received, 2);
        assert_eq!(stats.counts.decisions_distracted, 1);
        assert_eq!(stats.counts.frames_dropped, 5);
        assert_eq!(stats.counts.records_labeled, 0);
    }

    #[test]
    fn test_transparency_log_reset() {
        let log = TransparencyLog::new();

        log.record_many(Counter::FramesReceived, 100);
        log.record_many(Counter::RecordsLabeled, 7);
        log.reset();

        assert_eq!(log.stats().counts, CounterValues::default());
    }

    #[test]
    fn test_summary_format() {
        let log = TransparencyLog::new();
        let summary = log.summary();

        assert!(summary.contains("Frames received"));
        assert!(summary.contains("Records labeled"));
        assert!(summary.contains("Privacy Guarantee"));
        assert!(summary.contains("No raw landmark coordinates stored"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transparency.json");

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_many(Counter::FramesReceived, 42);
        log.record(Counter::DatasetsExported);
        log.save().unwrap();

        let restored = TransparencyLog::with_persistence(path);
        assert_eq!(restored.get(Counter::FramesReceived), 42);
        assert_eq!(restored.get(Counter::DatasetsExported), 1);
        assert_eq!(restored.get(Counter::MalformedLines), 0);
    }

    #[test]
    fn test_shared_log_across_threads() {
        let log = create_shared_log();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || log.record_many(Counter::FramesReceived, 10))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.get(Counter::FramesReceived), 40);
    }
}

//! Configuration for the gaze focus agent.

use crate::core::features::{DegeneratePolicy, EyeRegions};
use crate::core::windowing::{WindowMode, DEFAULT_DECISION_THRESHOLD, DEFAULT_WINDOW_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "gaze-focus-agent";

/// Main configuration for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scores per decision window
    pub window_size: usize,

    /// Tumbling or sliding windows
    pub window_mode: WindowMode,

    /// Window means strictly above this are distracted
    pub decision_threshold: f64,

    /// Landmark indices for both eyes
    pub eye_regions: EyeRegions,

    /// What to do with collapsed eye boxes
    pub degenerate_policy: DegeneratePolicy,

    /// Scoring model weights (JSON)
    pub model_path: Option<PathBuf>,

    /// Where labeled datasets are written
    pub export_path: PathBuf,

    /// Where the transparency log lives
    pub data_path: PathBuf,

    /// Frames arriving closer together than this are dropped
    #[serde(with = "duration_millis")]
    pub min_frame_interval: Duration,

    /// Margin around the face crop, as a fraction of the face box
    pub crop_padding: f64,

    /// Options handed to the upstream face-mesh detector
    pub detector: DetectorOptions,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            window_mode: WindowMode::default(),
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            eye_regions: EyeRegions::default(),
            degenerate_policy: DegeneratePolicy::default(),
            model_path: None,
            export_path: data_dir.join("datasets"),
            data_path: data_dir,
            min_frame_interval: Duration::ZERO,
            crop_padding: 0.2,
            detector: DetectorOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Validate and write configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)?;
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Reject values the classifier and extractor cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(ConfigError::Invalid(format!(
                "decision_threshold must be within [0, 1], got {}",
                self.decision_threshold
            )));
        }
        for (side, region) in self.eye_regions.iter() {
            if region.contour.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{side} eye contour is empty"
                )));
            }
        }
        if !self.crop_padding.is_finite() || self.crop_padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "crop_padding must be non-negative, got {}",
                self.crop_padding
            )));
        }
        Ok(())
    }
}

/// Face-mesh detector settings. The agent never interprets these; they are
/// forwarded to whatever produces the landmark stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Faces tracked per frame
    pub max_num_faces: u32,
    /// Iris refinement; required for the 478-point layout
    pub refine_landmarks: bool,
    /// Minimum face detection confidence
    pub min_detection_confidence: f64,
    /// Minimum landmark tracking confidence
    pub min_tracking_confidence: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_num_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::EyeRegion;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_size, 20);
        assert_eq!(config.decision_threshold, 0.5);
        assert_eq!(config.window_mode, WindowMode::Tumbling);
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Skip);
        assert_eq!(config.detector.max_num_faces, 1);
        assert!(config.detector.refine_landmarks);
        assert!(config.model_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_json(
            r#"{"window_size": 10, "window_mode": "sliding", "min_frame_interval": 40}"#,
        )
        .unwrap();
        assert_eq!(config.window_size, 10);
        assert_eq!(config.window_mode, WindowMode::Sliding);
        assert_eq!(config.min_frame_interval, Duration::from_millis(40));
        assert_eq!(config.eye_regions, EyeRegions::default());
        assert_eq!(config.detector, DetectorOptions::default());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.window_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.decision_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.eye_regions.right = EyeRegion::new(Vec::new(), 473);
        assert!(config.validate().is_err());

        assert!(matches!(
            Config::from_json(r#"{"window_size": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_serialized_interval_is_millis() {
        let mut config = Config::default();
        config.min_frame_interval = Duration::from_millis(250);
        let json: serde_json::Value = serde_json::to_value(&config).unwrap();
        assert_eq!(json["min_frame_interval"], 250);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        // Missing file falls back to defaults
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let mut config = Config::default();
        config.window_size = 12;
        config.window_mode = WindowMode::Sliding;
        config.min_frame_interval = Duration::from_millis(33);
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.decision_threshold = -0.1;
        assert!(matches!(config.save_to(&path), Err(ConfigError::Invalid(_))));
        assert!(!path.exists());
    }
}

//! Labeled training records and their on-disk format.
//!
//! A dataset is written as one JSON array of
//! `{"label": "focused"|"distracted", "features": [f, f, f, f]}` records.
//! Exports always rewrite the whole file; there is no incremental format.

use crate::core::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Human-assigned attention class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Focused,
    Distracted,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Focused => write!(f, "focused"),
            Label::Distracted => write!(f, "distracted"),
        }
    }
}

/// One labeled example.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    /// Class assigned by the labeler
    pub label: Label,
    /// Gaze features of the captured frame
    pub features: FeatureVector,
}

/// Running per-class totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    /// Records labeled focused
    pub focused: u64,
    /// Records labeled distracted
    pub distracted: u64,
}

impl ClassCounts {
    /// Count one more record of `label`.
    pub fn increment(&mut self, label: Label) {
        match label {
            Label::Focused => self.focused += 1,
            Label::Distracted => self.distracted += 1,
        }
    }

    /// Records counted for `label`.
    pub fn get(&self, label: Label) -> u64 {
        match label {
            Label::Focused => self.focused,
            Label::Distracted => self.distracted,
        }
    }

    /// Records across both classes.
    pub fn total(&self) -> u64 {
        self.focused + self.distracted
    }
}

/// Dataset errors.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, append-only collection of labeled records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<LabeledRecord>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end.
    pub fn push(&mut self, record: LabeledRecord) {
        self.records.push(record);
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[LabeledRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record has been added.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-class counts over every record.
    pub fn counts(&self) -> ClassCounts {
        let mut counts = ClassCounts::default();
        for record in &self.records {
            counts.increment(record.label);
        }
        counts
    }

    /// Concatenate datasets in the order given.
    pub fn combine(datasets: impl IntoIterator<Item = Dataset>) -> Self {
        let records = datasets.into_iter().flat_map(|d| d.records).collect();
        Self { records }
    }

    /// Serialize to the on-disk JSON array format.
    pub fn to_json(&self) -> Result<String, DatasetError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the on-disk JSON array format.
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a dataset previously written by [`Dataset::export`].
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the whole dataset to `path`.
    ///
    /// The data goes to a sibling temp file first and is renamed into place,
    /// so readers never observe a partial file.
    pub fn export(&self, path: &Path) -> Result<(), DatasetError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        std::fs::write(&tmp_path, json)?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!(records = self.len(), path = %path.display(), "dataset exported");
        Ok(())
    }
}

impl Extend<LabeledRecord> for Dataset {
    fn extend<T: IntoIterator<Item = LabeledRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

impl FromIterator<LabeledRecord> for Dataset {
    fn from_iter<T: IntoIterator<Item = LabeledRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a LabeledRecord;
    type IntoIter = std::slice::Iter<'a, LabeledRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

//! Training run history.
//!
//! A single JSON file in the data directory records every trainer
//! invocation and the annotation count at the last successful run. The
//! retrain check compares that count against the current annotation store.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One trainer invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRun {
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// Base model handed to the trainer, if any.
    pub base_model: Option<String>,
    /// Annotated boxes across the annotation store at launch.
    pub annotation_count: usize,
    /// Machine the run happened on.
    pub hostname: String,
    /// Whether the trainer exited successfully.
    pub success: bool,
}

/// Persistent record of past training runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Past runs, oldest first.
    #[serde(default)]
    pub runs: Vec<TrainingRun>,
    /// Annotation count at the last successful run.
    #[serde(default)]
    pub last_annotation_count: usize,
}

impl TrainingHistory {
    /// Load history from disk. A missing file is empty history.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| Error::HistoryRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| Error::HistoryParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write history back to disk, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| Error::JsonWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, content).map_err(|e| Error::HistoryWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Whether enough annotations have accumulated since the last
    /// successful run.
    pub fn should_retrain(&self, current_annotations: usize, min_new: usize) -> bool {
        current_annotations.saturating_sub(self.last_annotation_count) >= min_new
    }
}

/// Result of a retrain check, for display.
#[derive(Debug, Clone, Serialize)]
pub struct RetrainCheck {
    /// Annotated boxes currently in the annotation store.
    pub current_annotations: usize,
    /// Annotation count at the last successful run.
    pub last_annotation_count: usize,
    /// New annotations since that run.
    pub new_annotations: usize,
    /// Threshold that triggers retraining.
    pub min_new_annotations: usize,
    /// Whether retraining is due.
    pub retrain_due: bool,
}

/// Hostname for history records.
pub(crate) fn current_hostname() -> String {
    hostname::get().map_or_else(
        |_| "unknown".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}

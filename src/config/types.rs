//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CONFIDENCE_FLOOR, DEFAULT_DETECTION_THRESHOLD, DEFAULT_RETRAIN_MIN_NEW,
    DEFAULT_REVIEW_LIMIT, DEFAULT_TOP_K_ALTERNATIVES, data_layout, dataset,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Detector settings.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Species classification settings.
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Review queue settings.
    #[serde(default)]
    pub review: ReviewConfig,

    /// Dataset export settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Training orchestration settings.
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Config {
    /// Directory where incoming camera images land.
    #[must_use]
    pub fn incoming_dir(&self) -> PathBuf {
        self.paths.data_dir.join(data_layout::INCOMING_IMAGES)
    }

    /// Directory holding one prediction JSON per image.
    #[must_use]
    pub fn predictions_dir(&self) -> PathBuf {
        self.paths.data_dir.join(data_layout::PREDICTIONS)
    }

    /// Directory holding human annotation JSON files.
    #[must_use]
    pub fn annotations_dir(&self) -> PathBuf {
        self.paths.data_dir.join(data_layout::ANNOTATIONS)
    }

    /// Root of the exported training dataset.
    #[must_use]
    pub fn dataset_dir(&self) -> PathBuf {
        self.paths.data_dir.join(data_layout::DATASET)
    }

    /// Directory for model artifacts produced by training.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.paths.data_dir.join(data_layout::MODELS)
    }

    /// Path of the training history file.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.paths.data_dir.join(data_layout::TRAINING_HISTORY)
    }
}

/// Data directory layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory for images, predictions, annotations, the exported
    /// dataset and training state.
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detector command and fixed arguments. The image path and
    /// `--threshold <t>` are appended per invocation. Empty means no
    /// detector is configured.
    pub command: Vec<String>,

    /// Confidence threshold passed to the detector.
    pub threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }
}

/// Species classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Taxonomy classifier command; receives a PNG crop on stdin and
    /// prints ranked taxon/score pairs as JSON. Empty means not configured.
    pub taxonomy_command: Vec<String>,

    /// Discrete classifier command used when the taxonomy classifier is
    /// absent or unusable; same stdin contract, prints a class id or
    /// boxes as JSON. Empty means not configured.
    pub discrete_command: Vec<String>,

    /// Minimum confidence for attaching a species label to a detection.
    pub confidence_floor: f32,

    /// Number of ranked alternatives inspected when the top taxon falls
    /// outside the label set.
    pub top_k_alternatives: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            taxonomy_command: Vec::new(),
            discrete_command: Vec::new(),
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            top_k_alternatives: DEFAULT_TOP_K_ALTERNATIVES,
        }
    }
}

/// Review queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Maximum number of entries returned by the review queue.
    pub limit: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_REVIEW_LIMIT,
        }
    }
}

/// Dataset export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Fraction of each pool routed to the validation split.
    pub val_fraction: f32,

    /// Shuffle seed; identical annotations and seed reproduce the split.
    pub seed: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            val_fraction: dataset::DEFAULT_VAL_FRACTION,
            seed: dataset::DEFAULT_SEED,
        }
    }
}

/// Training orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// External trainer command and fixed arguments. The dataset manifest
    /// path is appended per invocation. Empty means not configured.
    pub command: Vec<String>,

    /// Base model identifier recorded in training history.
    pub base_model: Option<String>,

    /// Number of new annotated boxes since the last run that makes
    /// retraining worthwhile.
    pub min_new_annotations: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            base_model: None,
            min_new_annotations: DEFAULT_RETRAIN_MIN_NEW,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_derive_from_data_dir() {
        let config = Config::default();
        assert_eq!(config.incoming_dir(), PathBuf::from("data/images/incoming"));
        assert_eq!(config.predictions_dir(), PathBuf::from("data/predictions"));
        assert_eq!(config.annotations_dir(), PathBuf::from("data/annotations"));
        assert_eq!(config.dataset_dir(), PathBuf::from("data/dataset"));
        assert_eq!(
            config.history_path(),
            PathBuf::from("data/training_history.json")
        );
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.detection.threshold, 0.2);
        assert_eq!(config.classification.confidence_floor, 0.1);
        assert_eq!(config.classification.top_k_alternatives, 5);
        assert_eq!(config.review.limit, 50);
        assert_eq!(config.export.val_fraction, 0.2);
        assert_eq!(config.export.seed, 42);
        assert_eq!(config.training.min_new_annotations, 50);
        assert!(config.detection.command.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[paths]
data_dir = "/srv/camtrap"

[detection]
threshold = 0.35
"#,
        )
        .unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/camtrap"));
        assert_eq!(config.detection.threshold, 0.35);
        assert_eq!(config.review.limit, 50);
        assert_eq!(config.export.seed, 42);
    }
}

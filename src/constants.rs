//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "camtrap";

/// Default detector confidence threshold.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.2;

/// Default minimum confidence for accepting a classifier species label.
///
/// Trail-camera crops are often dark, blurred or partial, so the floor is
/// deliberately low; below it a detection keeps its box but carries no
/// species label.
pub const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.1;

/// Default number of ranked classifier alternatives inspected when the top
/// prediction resolves outside the label set.
pub const DEFAULT_TOP_K_ALTERNATIVES: usize = 5;

/// Default maximum number of entries in the review queue.
pub const DEFAULT_REVIEW_LIMIT: usize = 50;

/// Default number of new annotated boxes that makes retraining worthwhile.
pub const DEFAULT_RETRAIN_MIN_NEW: usize = 50;

/// Image file extensions accepted by the batch sweep and dataset export
/// (matched case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Crop preparation for the species classifier.
pub mod crop {
    /// Margin added around a detection box before cropping, as a fraction
    /// of the larger box dimension.
    pub const MARGIN_FRACTION: f32 = 0.1;

    /// Edge length in pixels of the square classifier input.
    pub const CLASSIFIER_INPUT_SIZE: u32 = 480;
}

/// Review queue reason buckets, thresholds on the per-image maximum
/// confidence. Each bound is exclusive on the upper side.
pub mod review_buckets {
    /// Below this the image is very uncertain.
    pub const VERY_UNCERTAIN_BELOW: f32 = 0.3;
    /// Below this (and at or above the previous bound) the image is uncertain.
    pub const UNCERTAIN_BELOW: f32 = 0.6;
    /// Below this the image is moderate; at or above it, confident.
    pub const MODERATE_BELOW: f32 = 0.8;
}

/// Reason bucket labels.
pub mod review_reasons {
    /// Label for the lowest-confidence bucket.
    pub const VERY_UNCERTAIN: &str = "very_uncertain";
    /// Label for the uncertain bucket.
    pub const UNCERTAIN: &str = "uncertain";
    /// Label for the moderate bucket.
    pub const MODERATE: &str = "moderate";
    /// Label for the confident bucket.
    pub const CONFIDENT: &str = "confident";
}

/// Dataset export constants.
pub mod dataset {
    /// Default validation fraction of each pool.
    pub const DEFAULT_VAL_FRACTION: f32 = 0.2;

    /// Default shuffle seed so repeated exports produce the same split.
    pub const DEFAULT_SEED: u64 = 42;

    /// Images subdirectory inside the dataset tree.
    pub const IMAGES_DIR: &str = "images";

    /// Labels subdirectory inside the dataset tree.
    pub const LABELS_DIR: &str = "labels";

    /// Training split name.
    pub const TRAIN_SPLIT: &str = "train";

    /// Validation split name.
    pub const VAL_SPLIT: &str = "val";

    /// Manifest filename written at the dataset root.
    pub const MANIFEST_FILENAME: &str = "dataset.yaml";

    /// Decimal places for normalized label coordinates.
    pub const LABEL_DECIMAL_PLACES: usize = 6;
}

/// Data directory layout under the configured data root.
pub mod data_layout {
    /// Incoming images directory, relative to the data root.
    pub const INCOMING_IMAGES: &str = "images/incoming";
    /// Prediction records directory.
    pub const PREDICTIONS: &str = "predictions";
    /// Human annotations directory.
    pub const ANNOTATIONS: &str = "annotations";
    /// Exported dataset directory.
    pub const DATASET: &str = "dataset";
    /// Model artifacts directory.
    pub const MODELS: &str = "models";
    /// Training history filename at the data root.
    pub const TRAINING_HISTORY: &str = "training_history.json";
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
    /// Decimal places for confidence persistence and formatting.
    pub const DECIMAL_PLACES: u32 = 4;
}

/// Detector category codes as emitted by the primary detector.
pub mod category_codes {
    /// Animal category code.
    pub const ANIMAL: &str = "1";
    /// Person category code.
    pub const PERSON: &str = "2";
    /// Vehicle category code.
    pub const VEHICLE: &str = "3";
}

/// Suffix appended to prediction files while they are being written.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

/// UTF-8 Byte Order Mark for Excel compatibility in CSV files.
pub const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";

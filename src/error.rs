//! Error types for camtrap.

/// Result type alias for camtrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for camtrap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Image directory does not exist.
    #[error("image directory does not exist: {path}")]
    ImageDirNotFound {
        /// Path to the missing directory.
        path: std::path::PathBuf,
    },

    /// Failed to open or decode an image.
    #[error("unreadable image '{path}'")]
    ImageOpen {
        /// Path to the image file.
        path: std::path::PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// Image has zero width or height.
    #[error("unreadable image '{path}': zero width or height")]
    ImageDimensions {
        /// Path to the image file.
        path: std::path::PathBuf,
    },

    /// Primary detector is not available.
    #[error("detector unavailable: {reason}")]
    DetectorUnavailable {
        /// Description of why the detector could not be used.
        reason: String,
    },

    /// Primary detector run produced no usable result.
    #[error("detection failed: {reason}")]
    DetectionFailed {
        /// Description of the detection failure.
        reason: String,
    },

    /// Species classifier invocation failed.
    #[error("classifier failed: {reason}")]
    ClassifierFailed {
        /// Description of the classifier failure.
        reason: String,
    },

    /// Failed to read a prediction file.
    #[error("failed to read prediction file '{path}'")]
    PredictionRead {
        /// Path to the prediction file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a prediction file.
    #[error("failed to parse prediction file '{path}'")]
    PredictionParse {
        /// Path to the prediction file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write a prediction file.
    #[error("failed to write prediction file '{path}'")]
    PredictionWrite {
        /// Path to the prediction file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a prediction record.
    #[error("failed to serialize prediction record")]
    PredictionSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read an annotation file.
    #[error("failed to read annotation file '{path}'")]
    AnnotationRead {
        /// Path to the annotation file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse an annotation file.
    #[error("failed to parse annotation file '{path}'")]
    AnnotationParse {
        /// Path to the annotation file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to create output directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a dataset label file.
    #[error("failed to write label file '{path}'")]
    LabelWrite {
        /// Path to the label file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy an image into the dataset tree.
    #[error("failed to copy image '{path}' into dataset")]
    ImageCopy {
        /// Path to the source image.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write CSV output file.
    #[error("failed to write CSV file '{path}'")]
    CsvWrite {
        /// Path to the CSV file.
        path: std::path::PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Dataset export produced nothing to train on.
    #[error("dataset export produced no samples: {reason}")]
    DatasetEmpty {
        /// Why the export came up empty.
        reason: String,
    },

    /// A training run is already in progress.
    #[error("a training run is already in progress")]
    TrainingInProgress,

    /// No trainer command configured.
    #[error("no trainer command configured (set training.command in config)")]
    TrainerNotConfigured,

    /// External trainer invocation failed.
    #[error("trainer run failed: {reason}")]
    TrainerFailed {
        /// Description of the trainer failure.
        reason: String,
    },

    /// Failed to read training history file.
    #[error("failed to read training history '{path}'")]
    HistoryRead {
        /// Path to the history file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse training history file.
    #[error("failed to parse training history '{path}'")]
    HistoryParse {
        /// Path to the history file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write training history file.
    #[error("failed to write training history '{path}'")]
    HistoryWrite {
        /// Path to the history file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

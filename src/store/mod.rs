//! Persisted prediction and annotation records.

pub mod annotations;
pub mod predictions;

pub use annotations::{
    Annotation, AnnotationFile, annotation_path, list_annotation_files, load_annotation,
};
pub use predictions::{
    Detection, PredictionRecord, cleanup_temp_files, list_prediction_files, load_record,
    prediction_path, save_record,
};

//! Human annotation records.
//!
//! Annotations are written by the review frontend; this crate only consumes
//! them. Parsing is deliberately tolerant: missing fields default, and a
//! record that marks an image as empty (reviewed, nothing in frame) is as
//! valid as one carrying boxes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One human-confirmed box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    /// Species label string; matched against the closed label set on export.
    pub species: String,
    /// Pixel corner box `[x1, y1, x2, y2]`; anything but 4 elements is
    /// dropped by consumers.
    pub bbox: Vec<i64>,
    /// Whether the box started life as a model prediction.
    pub from_prediction: bool,
    /// Model label the reviewer corrected, if any.
    pub original_species: Option<String>,
}

/// Annotation record for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationFile {
    /// Image file name (not a path).
    pub image: String,
    /// Confirmed boxes; empty together with `is_empty=false` means the image
    /// is still unreviewed.
    pub annotations: Vec<Annotation>,
    /// Reviewer confirmed the image shows nothing of interest.
    pub is_empty: bool,
}

impl AnnotationFile {
    /// Whether a human has finished with this image, either by confirming
    /// boxes or by marking it empty.
    #[must_use]
    pub fn is_reviewed(&self) -> bool {
        !self.annotations.is_empty() || self.is_empty
    }
}

/// Record path for an image file name: the image stem plus `.json`.
#[must_use]
pub fn annotation_path(annotations_dir: &Path, image_name: &str) -> PathBuf {
    let stem = Path::new(image_name)
        .file_stem()
        .map_or_else(|| image_name.to_string(), |s| s.to_string_lossy().into_owned());
    annotations_dir.join(format!("{stem}.json"))
}

/// Load one annotation record.
pub fn load_annotation(path: &Path) -> Result<AnnotationFile> {
    let contents = fs::read_to_string(path).map_err(|e| Error::AnnotationRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| Error::AnnotationParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// List annotation record paths in a directory, sorted by file name.
///
/// A missing directory reads as no annotations.
pub fn list_annotation_files(annotations_dir: &Path) -> Result<Vec<PathBuf>> {
    if !annotations_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(annotations_dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Count confirmed boxes across the annotation directory.
///
/// Unparseable records are logged and skipped; a missing directory counts as
/// zero.
pub fn count_annotation_boxes(annotations_dir: &Path) -> Result<usize> {
    let mut total = 0;
    for path in list_annotation_files(annotations_dir)? {
        match load_annotation(&path) {
            Ok(record) => total += record.annotations.len(),
            Err(e) => warn!("Skipping unreadable annotation {}: {e}", path.display()),
        }
    }
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_annotation(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_reviewed_states() {
        let unreviewed = AnnotationFile::default();
        assert!(!unreviewed.is_reviewed());

        let empty = AnnotationFile {
            is_empty: true,
            ..AnnotationFile::default()
        };
        assert!(empty.is_reviewed());

        let confirmed = AnnotationFile {
            annotations: vec![Annotation {
                species: "hare".to_string(),
                bbox: vec![10, 10, 50, 50],
                ..Annotation::default()
            }],
            ..AnnotationFile::default()
        };
        assert!(confirmed.is_reviewed());
    }

    #[test]
    fn test_missing_fields_default() {
        let record: AnnotationFile =
            serde_json::from_str(r#"{"image": "photo.jpg"}"#).unwrap();
        assert_eq!(record.image, "photo.jpg");
        assert!(record.annotations.is_empty());
        assert!(!record.is_empty);

        let annotation: Annotation =
            serde_json::from_str(r#"{"species": "fox", "bbox": [1, 2, 3, 4]}"#).unwrap();
        assert!(!annotation.from_prediction);
        assert!(annotation.original_species.is_none());
    }

    #[test]
    fn test_load_and_list_sorted() {
        let dir = TempDir::new().unwrap();
        write_annotation(
            dir.path(),
            "b_photo.json",
            r#"{"image": "b_photo.jpg", "annotations": [], "is_empty": true}"#,
        );
        write_annotation(
            dir.path(),
            "a_photo.json",
            r#"{"image": "a_photo.jpg", "annotations": [
                {"species": "fox", "bbox": [0, 0, 10, 10], "from_prediction": true}
            ], "is_empty": false}"#,
        );
        write_annotation(dir.path(), "notes.txt", "not an annotation");

        let files = list_annotation_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_photo.json", "b_photo.json"]);

        let first = load_annotation(&files[0]).unwrap();
        assert_eq!(first.annotations.len(), 1);
        assert_eq!(first.annotations[0].species, "fox");
        assert!(first.annotations[0].from_prediction);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let files = list_annotation_files(Path::new("/nonexistent/annotations")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_count_boxes_skips_malformed() {
        let dir = TempDir::new().unwrap();
        write_annotation(
            dir.path(),
            "one.json",
            r#"{"image": "one.jpg", "annotations": [
                {"species": "hare", "bbox": [0, 0, 5, 5]},
                {"species": "fox", "bbox": [5, 5, 9, 9]}
            ]}"#,
        );
        write_annotation(dir.path(), "two.json", "{broken");
        write_annotation(
            dir.path(),
            "three.json",
            r#"{"image": "three.jpg", "annotations": [], "is_empty": true}"#,
        );

        assert_eq!(count_annotation_boxes(dir.path()).unwrap(), 2);
    }

    #[test]
    fn test_annotation_path_uses_stem() {
        assert_eq!(
            annotation_path(Path::new("/data/annotations"), "photo_0001.jpg"),
            PathBuf::from("/data/annotations/photo_0001.json")
        );
    }
}

//! Persisted per-image prediction records.
//!
//! Each processed image gets exactly one JSON record named after the image
//! stem. Writes go through a temp file and an atomic rename so readers never
//! observe a half-written record; temp paths are registered so an interrupt
//! handler can sweep them up.

use crate::constants::{TEMP_FILE_SUFFIX, confidence};
use crate::detect::boxes::{Category, PixelBox};
use crate::detect::taxonomy::Species;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One detection within an image, as persisted.
///
/// `species`/`species_confidence` are set for animal detections the
/// classifier could label and for person detections (labeled directly);
/// otherwise both stay null, meaning detected but unidentified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Pixel box `[x1, y1, x2, y2]`.
    pub bbox: PixelBox,
    /// Semantic detector category.
    pub category: Category,
    /// Detector confidence.
    pub category_confidence: f32,
    /// Resolved species label, if any.
    #[serde(default)]
    pub species: Option<Species>,
    /// Confidence backing the species label.
    #[serde(default)]
    pub species_confidence: Option<f32>,
}

/// Prediction record for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Image file name (not a path).
    pub image: String,
    /// Detections in detector output order.
    pub predictions: Vec<Detection>,
}

/// Round a confidence to the persisted precision.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn round_confidence(value: f32) -> f32 {
    let scale = 10f32.powi(confidence::DECIMAL_PLACES as i32);
    (value * scale).round() / scale
}

/// Record path for an image file name: the image stem plus `.json`.
#[must_use]
pub fn prediction_path(predictions_dir: &Path, image_name: &str) -> PathBuf {
    let stem = Path::new(image_name)
        .file_stem()
        .map_or_else(|| image_name.to_string(), |s| s.to_string_lossy().into_owned());
    predictions_dir.join(format!("{stem}.json"))
}

/// List prediction record paths in a directory, sorted by file name.
///
/// A missing directory reads as no predictions.
pub fn list_prediction_files(predictions_dir: &Path) -> Result<Vec<PathBuf>> {
    if !predictions_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(predictions_dir)?
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

/// Load one prediction record.
pub fn load_record(path: &Path) -> Result<PredictionRecord> {
    let contents = fs::read_to_string(path).map_err(|e| Error::PredictionRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| Error::PredictionParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write one prediction record, replacing any previous record for the image.
///
/// The JSON lands in a temp file first and is renamed into place, so a crash
/// mid-write leaves the old record intact.
pub fn save_record(predictions_dir: &Path, record: &PredictionRecord) -> Result<PathBuf> {
    fs::create_dir_all(predictions_dir).map_err(|e| Error::OutputDirCreateFailed {
        path: predictions_dir.to_path_buf(),
        source: e,
    })?;

    let final_path = prediction_path(predictions_dir, &record.image);
    let temp_path = final_path.with_extension(format!("json{TEMP_FILE_SUFFIX}"));

    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Error::PredictionSerialize { source: e })?;

    register_temp_file(&temp_path);
    let write_result = fs::write(&temp_path, json)
        .and_then(|()| fs::rename(&temp_path, &final_path))
        .map_err(|e| Error::PredictionWrite {
            path: final_path.clone(),
            source: e,
        });
    unregister_temp_file(&temp_path);

    write_result?;
    Ok(final_path)
}

/// Global registry of in-flight temp files for cleanup on signal.
static ACTIVE_TEMP_FILES: std::sync::LazyLock<std::sync::Mutex<Vec<PathBuf>>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(Vec::new()));

/// Register a temp path for cleanup on signal.
fn register_temp_file(path: &Path) {
    if let Ok(mut files) = ACTIVE_TEMP_FILES.lock() {
        files.push(path.to_path_buf());
    }
}

/// Unregister a temp path after it was renamed or removed.
fn unregister_temp_file(path: &Path) {
    if let Ok(mut files) = ACTIVE_TEMP_FILES.lock() {
        files.retain(|p| p != path);
    }
}

/// Remove all registered temp files. Called on signal.
pub fn cleanup_temp_files() {
    if let Ok(files) = ACTIVE_TEMP_FILES.lock() {
        for path in files.iter() {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record() -> PredictionRecord {
        PredictionRecord {
            image: "photo_0001.jpg".to_string(),
            predictions: vec![
                Detection {
                    bbox: PixelBox {
                        x1: 100,
                        y1: 100,
                        x2: 300,
                        y2: 300,
                    },
                    category: Category::Animal,
                    category_confidence: 0.9,
                    species: Some(Species::Hare),
                    species_confidence: Some(0.7),
                },
                Detection {
                    bbox: PixelBox {
                        x1: 0,
                        y1: 0,
                        x2: 50,
                        y2: 80,
                    },
                    category: Category::Vehicle,
                    category_confidence: 0.5,
                    species: None,
                    species_confidence: None,
                },
            ],
        }
    }

    #[test]
    fn test_round_confidence_to_four_decimals() {
        assert_eq!(round_confidence(0.123_456), 0.1235);
        assert_eq!(round_confidence(0.999_99), 1.0);
        assert_eq!(round_confidence(0.0), 0.0);
    }

    #[test]
    fn test_prediction_path_uses_image_stem() {
        let dir = Path::new("/data/predictions");
        assert_eq!(
            prediction_path(dir, "photo_0001.jpg"),
            PathBuf::from("/data/predictions/photo_0001.json")
        );
        assert_eq!(
            prediction_path(dir, "no_extension"),
            PathBuf::from("/data/predictions/no_extension.json")
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let record = sample_record();

        let path = save_record(dir.path(), &record).unwrap();
        assert_eq!(path, dir.path().join("photo_0001.json"));

        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_save_replaces_previous_record() {
        let dir = TempDir::new().unwrap();
        let mut record = sample_record();
        save_record(dir.path(), &record).unwrap();

        record.predictions.clear();
        let path = save_record(dir.path(), &record).unwrap();

        let loaded = load_record(&path).unwrap();
        assert!(loaded.predictions.is_empty());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        save_record(dir.path(), &sample_record()).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.file_name().to_string_lossy().into_owned()))
            .filter(|name| name.ends_with(TEMP_FILE_SUFFIX))
            .collect();
        assert!(leftovers.is_empty(), "leftover temp files: {leftovers:?}");
    }

    #[test]
    fn test_list_prediction_files_sorted_json_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json.tmp"), "{}").unwrap();

        let files = list_prediction_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        assert!(list_prediction_files(Path::new("/nonexistent")).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_record_fails() {
        let result = load_record(Path::new("/nonexistent/record.json"));
        assert!(matches!(result, Err(Error::PredictionRead { .. })));
    }

    #[test]
    fn test_load_malformed_record_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let result = load_record(&path);
        assert!(matches!(result, Err(Error::PredictionParse { .. })));
    }

    #[test]
    fn test_cleanup_removes_registered_temp_files() {
        let dir = TempDir::new().unwrap();
        let temp_path = dir.path().join("photo.json.tmp");
        fs::write(&temp_path, "partial").unwrap();

        register_temp_file(&temp_path);
        cleanup_temp_files();
        assert!(!temp_path.exists());
        unregister_temp_file(&temp_path);
    }

    #[test]
    fn test_detection_without_species_round_trips_null() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(json.contains("\"species\":null") || json.contains("\"species\": null"));
        let back: PredictionRecord = serde_json::from_str(&json).unwrap();
        assert!(back.predictions[1].species.is_none());
    }
}

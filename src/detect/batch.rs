//! Batch sweep over the incoming image directory.
//!
//! Walks the directory once, runs the per-image pipeline on everything that
//! does not already have a prediction record, and collects per-image failures
//! into the report instead of aborting the sweep.

use crate::constants::IMAGE_EXTENSIONS;
use crate::detect::pipeline::DetectionPipeline;
use crate::error::{Error, Result};
use crate::store::predictions::{prediction_path, save_record};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// One failed image in a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Image file name.
    pub image: String,
    /// Human-readable failure description.
    pub reason: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Images processed in this run.
    pub processed: usize,
    /// Images skipped because a prediction record already exists.
    pub skipped: usize,
    /// Total detections across processed images.
    pub detections: usize,
    /// Images that failed, with reasons.
    pub failures: Vec<BatchFailure>,
}

/// List image files in a directory, sorted by file name.
pub fn collect_images(image_dir: &Path) -> Result<Vec<PathBuf>> {
    if !image_dir.is_dir() {
        return Err(Error::ImageDirNotFound {
            path: image_dir.to_path_buf(),
        });
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(image_dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Sweep the image directory through the pipeline.
///
/// Existing prediction records are skipped unless `force` is set. Per-image
/// errors end up in the report's failure list and the sweep continues; only
/// setup problems (missing image directory) abort the run.
pub fn run_batch(
    pipeline: &DetectionPipeline<'_>,
    image_dir: &Path,
    predictions_dir: &Path,
    force: bool,
    show_progress: bool,
) -> Result<BatchReport> {
    let images = collect_images(image_dir)?;
    if images.is_empty() {
        info!("No images found in {}", image_dir.display());
        return Ok(BatchReport::default());
    }

    let mut report = BatchReport::default();
    let pb = create_progress(images.len(), show_progress);

    for image_path in &images {
        let image_name = image_path.file_name().map_or_else(
            || image_path.to_string_lossy().into_owned(),
            |n| n.to_string_lossy().into_owned(),
        );

        if !force && prediction_path(predictions_dir, &image_name).exists() {
            report.skipped += 1;
            inc_progress(pb.as_ref());
            continue;
        }

        let result = pipeline.process_image(image_path).and_then(|record| {
            let count = record.predictions.len();
            save_record(predictions_dir, &record)?;
            Ok(count)
        });
        match result {
            Ok(count) => {
                report.processed += 1;
                report.detections += count;
            }
            Err(e) => {
                error!("Failed to process {}: {e}", image_path.display());
                report.failures.push(BatchFailure {
                    image: image_name,
                    reason: e.to_string(),
                });
            }
        }
        inc_progress(pb.as_ref());
    }

    finish_progress(pb, "done");
    info!(
        "Processed {} images ({} skipped, {} failed), {} detections",
        report.processed,
        report.skipped,
        report.failures.len(),
        report.detections
    );
    Ok(report)
}

/// Create a progress bar for the sweep.
fn create_progress(total_images: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_images == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_images as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} images ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detect::boxes::RelativeBox;
    use crate::detect::detector::{Detector, RawDetection};
    use crate::detect::pipeline::PipelineOptions;
    use image::DynamicImage;
    use tempfile::TempDir;

    struct FakeDetector {
        per_image: usize,
    }

    impl Detector for FakeDetector {
        fn detect(&self, _image: &Path, _threshold: f32) -> Result<Vec<RawDetection>> {
            Ok((0..self.per_image)
                .map(|_| RawDetection {
                    bbox: RelativeBox {
                        x: 0.1,
                        y: 0.1,
                        w: 0.5,
                        h: 0.5,
                    },
                    conf: 0.8,
                    category: "1".to_string(),
                })
                .collect())
        }
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            threshold: 0.2,
            confidence_floor: 0.1,
            top_k_alternatives: 5,
        }
    }

    fn write_image(dir: &Path, name: &str) {
        DynamicImage::new_rgb8(64, 64).save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        write_image(dir.path(), "b.jpg");
        write_image(dir.path(), "a.PNG");
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let images = collect_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg"]);
    }

    #[test]
    fn test_collect_images_missing_dir_fails() {
        let result = collect_images(Path::new("/nonexistent/incoming"));
        assert!(matches!(result, Err(Error::ImageDirNotFound { .. })));
    }

    #[test]
    fn test_batch_processes_and_writes_records() {
        let dir = TempDir::new().unwrap();
        let image_dir = dir.path().join("incoming");
        let predictions_dir = dir.path().join("predictions");
        fs::create_dir_all(&image_dir).unwrap();
        write_image(&image_dir, "one.jpg");
        write_image(&image_dir, "two.jpg");

        let detector = FakeDetector { per_image: 2 };
        let pipeline = DetectionPipeline::new(&detector, None, None, options());

        let report = run_batch(&pipeline, &image_dir, &predictions_dir, false, false).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.detections, 4);
        assert!(report.failures.is_empty());
        assert!(predictions_dir.join("one.json").exists());
        assert!(predictions_dir.join("two.json").exists());
    }

    #[test]
    fn test_batch_skips_existing_unless_forced() {
        let dir = TempDir::new().unwrap();
        let image_dir = dir.path().join("incoming");
        let predictions_dir = dir.path().join("predictions");
        fs::create_dir_all(&image_dir).unwrap();
        write_image(&image_dir, "one.jpg");

        let detector = FakeDetector { per_image: 1 };
        let pipeline = DetectionPipeline::new(&detector, None, None, options());

        let first = run_batch(&pipeline, &image_dir, &predictions_dir, false, false).unwrap();
        assert_eq!(first.processed, 1);

        let second = run_batch(&pipeline, &image_dir, &predictions_dir, false, false).unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 1);

        let forced = run_batch(&pipeline, &image_dir, &predictions_dir, true, false).unwrap();
        assert_eq!(forced.processed, 1);
        assert_eq!(forced.skipped, 0);
    }

    #[test]
    fn test_batch_isolates_per_image_failures() {
        let dir = TempDir::new().unwrap();
        let image_dir = dir.path().join("incoming");
        let predictions_dir = dir.path().join("predictions");
        fs::create_dir_all(&image_dir).unwrap();
        write_image(&image_dir, "good.jpg");
        fs::write(image_dir.join("broken.jpg"), b"not an image").unwrap();

        let detector = FakeDetector { per_image: 1 };
        let pipeline = DetectionPipeline::new(&detector, None, None, options());

        let report = run_batch(&pipeline, &image_dir, &predictions_dir, false, false).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].image, "broken.jpg");
        assert!(report.failures[0].reason.contains("unreadable image"));
        assert!(predictions_dir.join("good.json").exists());
        assert!(!predictions_dir.join("broken.json").exists());
    }

    #[test]
    fn test_batch_empty_dir_is_empty_report() {
        let dir = TempDir::new().unwrap();
        let image_dir = dir.path().join("incoming");
        fs::create_dir_all(&image_dir).unwrap();

        let detector = FakeDetector { per_image: 0 };
        let pipeline = DetectionPipeline::new(&detector, None, None, options());

        let report =
            run_batch(&pipeline, &image_dir, &dir.path().join("predictions"), false, false)
                .unwrap();
        assert_eq!(report.processed, 0);
        assert!(report.failures.is_empty());
    }
}

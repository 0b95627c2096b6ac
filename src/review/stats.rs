//! Annotation progress statistics.

use crate::error::Result;
use crate::store::annotations::{annotation_path, list_annotation_files, load_annotation};
use crate::store::predictions::{list_prediction_files, load_record};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Counts describing how far review work has progressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationStats {
    /// Image files in the incoming directory.
    pub total_images: usize,
    /// Images with confirmed boxes.
    pub annotated_images: usize,
    /// Images a reviewer marked as showing nothing.
    pub empty_images: usize,
    /// Images with a prediction record.
    pub predicted_images: usize,
    /// Predicted images still waiting for review.
    pub unannotated_with_predictions: usize,
    /// Confirmed boxes per species label; labels outside the set count under
    /// `other`.
    pub species_distribution: BTreeMap<String, usize>,
}

/// Collect statistics across the data directories. Missing directories read
/// as zero; unreadable records are logged and skipped.
pub fn collect_stats(
    image_dir: &Path,
    predictions_dir: &Path,
    annotations_dir: &Path,
) -> Result<AnnotationStats> {
    let mut stats = AnnotationStats::default();

    if image_dir.is_dir() {
        stats.total_images = crate::detect::batch::collect_images(image_dir)?.len();
    }

    for path in list_annotation_files(annotations_dir)? {
        let record = match load_annotation(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable annotation {}: {e}", path.display());
                continue;
            }
        };
        // An empty mark retracts any leftover boxes, so such a record counts
        // only as empty and contributes nothing to the distribution.
        if record.is_empty {
            stats.empty_images += 1;
        } else if !record.annotations.is_empty() {
            stats.annotated_images += 1;
            for annotation in &record.annotations {
                let label = if annotation.species.is_empty() {
                    "other".to_string()
                } else {
                    annotation.species.clone()
                };
                *stats.species_distribution.entry(label).or_insert(0) += 1;
            }
        }
    }

    for path in list_prediction_files(predictions_dir)? {
        let record = match load_record(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable prediction {}: {e}", path.display());
                continue;
            }
        };
        stats.predicted_images += 1;

        let annotation = annotation_path(annotations_dir, &record.image);
        let reviewed = annotation.is_file()
            && load_annotation(&annotation).is_ok_and(|a| a.is_reviewed());
        if !reviewed {
            stats.unannotated_with_predictions += 1;
        }
    }

    Ok(stats)
}

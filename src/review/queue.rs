//! Confidence-ranked review queue.
//!
//! A read-only query over the predictions and annotations directories: every
//! predicted image that no human has finished with yet is ranked by how
//! unsure the models were, least confident first, so reviewer time goes where
//! it pays off most.

use crate::constants::{UTF8_BOM, review_buckets, review_reasons};
use crate::error::{Error, Result};
use crate::store::annotations::{annotation_path, load_annotation};
use crate::store::predictions::{
    PredictionRecord, list_prediction_files, load_record, round_confidence,
};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Confidence bucket an image falls into, from its strongest detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    /// Strongest detection below the very-uncertain bound.
    VeryUncertain,
    /// Strongest detection below the uncertain bound.
    Uncertain,
    /// Strongest detection below the moderate bound.
    Moderate,
    /// Everything above.
    Confident,
}

impl ReviewReason {
    /// Bucket a per-image maximum confidence.
    #[must_use]
    pub fn from_max_confidence(max_confidence: f32) -> Self {
        if max_confidence < review_buckets::VERY_UNCERTAIN_BELOW {
            Self::VeryUncertain
        } else if max_confidence < review_buckets::UNCERTAIN_BELOW {
            Self::Uncertain
        } else if max_confidence < review_buckets::MODERATE_BELOW {
            Self::Moderate
        } else {
            Self::Confident
        }
    }

    /// Stable label used in listings and CSV output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryUncertain => review_reasons::VERY_UNCERTAIN,
            Self::Uncertain => review_reasons::UNCERTAIN,
            Self::Moderate => review_reasons::MODERATE,
            Self::Confident => review_reasons::CONFIDENT,
        }
    }
}

impl Serialize for ReviewReason {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

/// One image awaiting review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewCandidate {
    /// Image file name.
    pub image: String,
    /// Strongest per-detection confidence.
    pub max_confidence: f32,
    /// Weakest per-detection confidence.
    pub min_confidence: f32,
    /// Mean per-detection confidence.
    pub avg_confidence: f32,
    /// Number of detections on the image.
    pub predictions_count: usize,
    /// Confidence bucket of the strongest detection.
    pub reason: ReviewReason,
}

/// Confidence value a detection contributes to the ranking: the species
/// confidence when a label was attached, the raw category confidence
/// otherwise.
fn ranking_values(record: &PredictionRecord) -> Vec<f32> {
    record
        .predictions
        .iter()
        .map(|d| d.species_confidence.unwrap_or(d.category_confidence))
        .collect()
}

/// Build the review queue, least confident first, truncated to `limit`.
///
/// An image qualifies when it has a prediction record with at least one
/// detection, the image file still exists, and no reviewer has either
/// confirmed boxes or marked it empty. Unparseable prediction records are
/// skipped with a warning; unparseable annotation records leave the image in
/// the queue (better reviewed twice than silently dropped).
pub fn uncertainty_ranking(
    predictions_dir: &Path,
    annotations_dir: &Path,
    image_dir: &Path,
    limit: usize,
) -> Result<Vec<ReviewCandidate>> {
    let mut candidates = Vec::new();

    for path in list_prediction_files(predictions_dir)? {
        let record = match load_record(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable prediction {}: {e}", path.display());
                continue;
            }
        };

        if record.predictions.is_empty() {
            continue;
        }
        if !image_dir.join(&record.image).is_file() {
            continue;
        }

        let annotation = annotation_path(annotations_dir, &record.image);
        if annotation.is_file() {
            match load_annotation(&annotation) {
                Ok(existing) if existing.is_reviewed() => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Treating {} as unreviewed: {e}",
                        annotation.display()
                    );
                }
            }
        }

        let values = ranking_values(&record);
        let max = values.iter().copied().fold(0.0f32, f32::max);
        let min = values.iter().copied().fold(1.0f32, f32::min);
        let sum: f32 = values.iter().sum();

        #[allow(clippy::cast_precision_loss)]
        let avg = sum / values.len() as f32;

        candidates.push(ReviewCandidate {
            image: record.image,
            max_confidence: round_confidence(max),
            min_confidence: round_confidence(min),
            avg_confidence: round_confidence(avg),
            predictions_count: values.len(),
            reason: ReviewReason::from_max_confidence(max),
        });
    }

    // Stable sort keeps file-name order among equal confidences.
    candidates.sort_by(|a, b| a.max_confidence.total_cmp(&b.max_confidence));
    candidates.truncate(limit);
    Ok(candidates)
}

/// Write the queue as CSV with a BOM so spreadsheet tools pick up UTF-8.
pub fn write_queue_csv(candidates: &[ReviewCandidate], path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    for candidate in candidates {
        writer.serialize(candidate).map_err(|e| Error::CsvWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    writer.flush()?;
    Ok(())
}

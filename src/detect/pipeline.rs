//! Per-image detection pipeline.
//!
//! Orchestrates the two model stages for one image: the primary detector
//! proposes category boxes, animal boxes are cropped and handed to a species
//! classifier, classifier output is resolved onto the closed label set. The
//! result is one [`PredictionRecord`] mirroring detector output order.
//!
//! Failure policy: an unreadable image or a broken detector fails the whole
//! image; a broken classifier only costs the species label on the affected
//! detection and is logged.

use crate::detect::boxes::Category;
use crate::detect::boxes::PixelBox;
use crate::detect::classifier::{DiscreteClassifier, TaxonomyClassifier};
use crate::detect::crop::prepare_crop;
use crate::detect::detector::Detector;
use crate::detect::taxonomy::{Species, resolve_ranked};
use crate::error::{Error, Result};
use crate::store::predictions::{Detection, PredictionRecord, round_confidence};
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, warn};

/// Tunables shared by every image in a run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Detector confidence threshold.
    pub threshold: f32,
    /// Minimum classifier confidence for attaching a species label.
    pub confidence_floor: f32,
    /// Ranked alternatives inspected by the rescue aggregation.
    pub top_k_alternatives: usize,
}

/// Two-stage detection pipeline over borrowed model seams.
pub struct DetectionPipeline<'a> {
    detector: &'a dyn Detector,
    taxonomy: Option<&'a dyn TaxonomyClassifier>,
    discrete: Option<&'a dyn DiscreteClassifier>,
    options: PipelineOptions,
}

impl<'a> DetectionPipeline<'a> {
    /// Assemble a pipeline from model seams and tunables. Either classifier
    /// may be absent; animal detections then keep a null species.
    pub fn new(
        detector: &'a dyn Detector,
        taxonomy: Option<&'a dyn TaxonomyClassifier>,
        discrete: Option<&'a dyn DiscreteClassifier>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            detector,
            taxonomy,
            discrete,
            options,
        }
    }

    /// Process one image into a prediction record.
    pub fn process_image(&self, image_path: &Path) -> Result<PredictionRecord> {
        let image = image::open(image_path).map_err(|e| Error::ImageOpen {
            path: image_path.to_path_buf(),
            source: e,
        })?;
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(Error::ImageDimensions {
                path: image_path.to_path_buf(),
            });
        }

        let image_name = image_path.file_name().map_or_else(
            || image_path.to_string_lossy().into_owned(),
            |n| n.to_string_lossy().into_owned(),
        );

        let raw = self.detector.detect(image_path, self.options.threshold)?;
        debug!("{image_name}: {} raw detections", raw.len());

        let mut predictions = Vec::with_capacity(raw.len());
        for detection in raw {
            let category = Category::from_code(&detection.category);
            let bbox = detection.bbox.to_pixels(width, height);

            let (species, species_confidence) = match category {
                Category::Person => (
                    Some(Species::Human),
                    Some(round_confidence(detection.conf)),
                ),
                Category::Animal => self.label_animal(&image, &bbox, &image_name),
                Category::Vehicle | Category::Unknown => (None, None),
            };

            predictions.push(Detection {
                bbox,
                category,
                category_confidence: round_confidence(detection.conf),
                species,
                species_confidence,
            });
        }

        Ok(PredictionRecord {
            image: image_name,
            predictions,
        })
    }

    /// Crop, classify and floor-gate one animal detection.
    fn label_animal(
        &self,
        image: &DynamicImage,
        bbox: &PixelBox,
        image_name: &str,
    ) -> (Option<Species>, Option<f32>) {
        let Some((species, confidence)) = self.classify_crop(image, bbox, image_name) else {
            return (None, None);
        };
        if confidence < self.options.confidence_floor {
            debug!(
                "{image_name}: dropping {species} at {confidence:.4} (below floor {})",
                self.options.confidence_floor
            );
            return (None, None);
        }
        (Some(species), Some(round_confidence(confidence)))
    }

    /// Run the classifier cascade on one crop: taxonomy first, discrete as
    /// fallback when the taxonomy stage is absent or unusable.
    fn classify_crop(
        &self,
        image: &DynamicImage,
        bbox: &PixelBox,
        image_name: &str,
    ) -> Option<(Species, f32)> {
        let crop = prepare_crop(image, bbox);

        if let Some(taxonomy) = self.taxonomy {
            match taxonomy.classify(&crop) {
                Ok(ranked) => {
                    if let Some(resolution) =
                        resolve_ranked(&ranked, self.options.top_k_alternatives)
                    {
                        return Some((resolution.species, resolution.confidence));
                    }
                    warn!("{image_name}: taxonomy classifier returned no predictions");
                }
                Err(e) => warn!("{image_name}: taxonomy classifier failed: {e}"),
            }
        }

        if let Some(discrete) = self.discrete {
            match discrete.classify(&crop) {
                Ok(output) => {
                    if let Some((class_id, confidence)) = output.best() {
                        return Some((Species::from_class_id(class_id), confidence));
                    }
                    warn!("{image_name}: discrete classifier found nothing in crop");
                }
                Err(e) => warn!("{image_name}: discrete classifier failed: {e}"),
            }
        }

        None
    }
}

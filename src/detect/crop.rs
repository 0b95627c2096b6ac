//! Classifier input preparation.
//!
//! Detections are classified on a crop of the source image, padded with a
//! margin of context and resized to the square input the species classifier
//! expects. The margin helps with partial or edge-touching boxes where the
//! animal extends beyond the detector rectangle.

use crate::constants::crop::{CLASSIFIER_INPUT_SIZE, MARGIN_FRACTION};
use crate::detect::boxes::PixelBox;
use image::DynamicImage;
use image::imageops::FilterType;

/// Expand a box by the configured context margin, clamped to image bounds.
///
/// The margin is a fraction of the larger box dimension, applied on all four
/// sides. Degenerate zero-area boxes are widened to at least one pixel so the
/// crop below always has content.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn expand_box(bbox: &PixelBox, width: u32, height: u32) -> PixelBox {
    let longest = bbox.width().max(bbox.height());
    let margin = (f64::from(longest) * f64::from(MARGIN_FRACTION)) as u32;

    let mut x1 = bbox.x1.saturating_sub(margin);
    let mut y1 = bbox.y1.saturating_sub(margin);
    let mut x2 = bbox.x2.saturating_add(margin).min(width);
    let mut y2 = bbox.y2.saturating_add(margin).min(height);

    if x2 <= x1 {
        if x2 < width {
            x2 += 1;
        } else {
            x1 = x1.saturating_sub(1);
        }
    }
    if y2 <= y1 {
        if y2 < height {
            y2 += 1;
        } else {
            y1 = y1.saturating_sub(1);
        }
    }

    PixelBox { x1, y1, x2, y2 }
}

/// Cut the padded crop for a detection and resize it to the classifier input
/// size.
#[must_use]
pub fn prepare_crop(image: &DynamicImage, bbox: &PixelBox) -> DynamicImage {
    let expanded = expand_box(bbox, image.width(), image.height());
    let crop = image.crop_imm(
        expanded.x1,
        expanded.y1,
        expanded.width(),
        expanded.height(),
    );
    crop.resize_exact(
        CLASSIFIER_INPUT_SIZE,
        CLASSIFIER_INPUT_SIZE,
        FilterType::Lanczos3,
    )
}

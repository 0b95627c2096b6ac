//! Training dataset export.
//!
//! Turns confirmed annotations into a YOLO-style directory tree:
//!
//! ```text
//! dataset/
//!   images/{train,val}/<image files>
//!   labels/{train,val}/<stem>.txt       one "class xc yc w h" line per box
//!   dataset.yaml
//! ```
//!
//! Reviewer-confirmed empty images ride along as background samples with
//! empty label files. The split is deterministic: the same annotations and
//! seed always land every image in the same split with byte-identical
//! labels, and each run fully replaces the previous tree.

use crate::constants::dataset::{
    IMAGES_DIR, LABELS_DIR, LABEL_DECIMAL_PLACES, TRAIN_SPLIT, VAL_SPLIT,
};
use crate::dataset::manifest::write_manifest;
use crate::detect::batch::collect_images;
use crate::detect::boxes::PixelBox;
use crate::detect::taxonomy::Species;
use crate::error::{Error, Result};
use crate::store::annotations::{AnnotationFile, list_annotation_files, load_annotation};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Export tunables.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Fraction of each pool routed to the validation split.
    pub val_fraction: f32,
    /// Shuffle seed.
    pub seed: u64,
}

/// Result of an export run.
#[derive(Debug)]
pub enum ExportOutcome {
    /// Dataset written; the report says what went where.
    Exported(ExportReport),
    /// Nothing to export. Not an error; callers decide how much that
    /// matters.
    Empty {
        /// Why the export came up empty.
        reason: String,
    },
}

/// What an export run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Annotated images exported.
    pub total: usize,
    /// Annotated images in the training split.
    pub train: usize,
    /// Annotated images in the validation split.
    pub val: usize,
    /// Background images exported.
    pub background: usize,
    /// Background images in the training split.
    pub bg_train: usize,
    /// Background images in the validation split.
    pub bg_val: usize,
    /// Label lines written across all label files.
    pub annotations_total: usize,
    /// Label lines per species.
    pub species_counts: BTreeMap<String, usize>,
    /// Boxes skipped for an unknown species label or malformed geometry.
    pub skipped_unknown: usize,
    /// Path of the written manifest.
    pub manifest_path: PathBuf,
}

/// One annotated image queued for export.
struct AnnotatedSample {
    image_path: PathBuf,
    record: AnnotationFile,
}

/// Validation-split size for a pool: `ceil(n * fraction)`, at least one
/// sample when the pool is non-empty, never the whole pool unless n = 1.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn val_count(n: usize, fraction: f32) -> usize {
    if n == 0 {
        return 0;
    }
    let raw = (n as f64 * f64::from(fraction)).ceil() as usize;
    raw.clamp(1, n)
}

/// Index images by file stem so annotation stems can be joined back to their
/// image files regardless of extension.
fn image_index(image_dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut index = BTreeMap::new();
    if !image_dir.is_dir() {
        return Ok(index);
    }
    for path in collect_images(image_dir)? {
        if let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) {
            // First in sorted order wins on duplicate stems.
            index.entry(stem).or_insert(path);
        }
    }
    Ok(index)
}

/// Export confirmed annotations into a training dataset.
///
/// Reads every annotation record in sorted order, joins each to its image
/// file, shuffles both pools with a seeded generator and writes the split
/// tree plus the manifest. Returns [`ExportOutcome::Empty`] when there is
/// nothing usable; real I/O failures are errors.
pub fn export_dataset(
    annotations_dir: &Path,
    image_dir: &Path,
    dataset_dir: &Path,
    options: &ExportOptions,
) -> Result<ExportOutcome> {
    if !annotations_dir.is_dir() {
        return Ok(ExportOutcome::Empty {
            reason: format!(
                "annotations directory does not exist: {}",
                annotations_dir.display()
            ),
        });
    }

    let images = image_index(image_dir)?;
    let mut annotated: Vec<AnnotatedSample> = Vec::new();
    let mut background: Vec<PathBuf> = Vec::new();

    for path in list_annotation_files(annotations_dir)? {
        let record = match load_annotation(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable annotation {}: {e}", path.display());
                continue;
            }
        };
        if !record.is_reviewed() {
            continue;
        }

        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some(image_path) = images.get(&stem) else {
            warn!("No image file for annotation {}", path.display());
            continue;
        };

        // The empty flag wins over any leftover boxes: a reviewer marking an
        // image empty retracts its earlier annotations.
        if record.is_empty {
            background.push(image_path.clone());
        } else {
            annotated.push(AnnotatedSample {
                image_path: image_path.clone(),
                record,
            });
        }
    }

    if annotated.is_empty() && background.is_empty() {
        return Ok(ExportOutcome::Empty {
            reason: "no reviewed annotations with matching images".to_string(),
        });
    }

    prepare_tree(dataset_dir)?;

    // One generator, fixed draw order: annotated pool first, background
    // second. Reordering the draws would silently reshuffle every split.
    let mut rng = StdRng::seed_from_u64(options.seed);
    annotated.shuffle(&mut rng);
    background.shuffle(&mut rng);

    let annotated_val = val_count(annotated.len(), options.val_fraction);
    let background_val = val_count(background.len(), options.val_fraction);

    let mut report = ExportReport {
        total: annotated.len(),
        train: annotated.len() - annotated_val,
        val: annotated_val,
        background: background.len(),
        bg_train: background.len() - background_val,
        bg_val: background_val,
        annotations_total: 0,
        species_counts: BTreeMap::new(),
        skipped_unknown: 0,
        manifest_path: PathBuf::new(),
    };

    for (index, sample) in annotated.iter().enumerate() {
        let split = if index < annotated_val { VAL_SPLIT } else { TRAIN_SPLIT };
        write_annotated_sample(dataset_dir, split, sample, &mut report)?;
    }
    for (index, image_path) in background.iter().enumerate() {
        let split = if index < background_val { VAL_SPLIT } else { TRAIN_SPLIT };
        copy_image(dataset_dir, split, image_path)?;
        write_label_file(dataset_dir, split, image_path, String::new())?;
    }

    report.manifest_path = write_manifest(dataset_dir)?;
    info!(
        "Exported {} annotated + {} background images ({} label lines, {} skipped boxes)",
        report.total, report.background, report.annotations_total, report.skipped_unknown
    );
    Ok(ExportOutcome::Exported(report))
}

/// Remove any previous split tree and create a fresh one.
fn prepare_tree(dataset_dir: &Path) -> Result<()> {
    for subdir in [IMAGES_DIR, LABELS_DIR] {
        let path = dataset_dir.join(subdir);
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        for split in [TRAIN_SPLIT, VAL_SPLIT] {
            let split_dir = path.join(split);
            fs::create_dir_all(&split_dir).map_err(|e| Error::OutputDirCreateFailed {
                path: split_dir,
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Copy one annotated image and write its label file.
fn write_annotated_sample(
    dataset_dir: &Path,
    split: &str,
    sample: &AnnotatedSample,
    report: &mut ExportReport,
) -> Result<()> {
    let (width, height) =
        image::image_dimensions(&sample.image_path).map_err(|e| Error::ImageOpen {
            path: sample.image_path.clone(),
            source: e,
        })?;
    if width == 0 || height == 0 {
        return Err(Error::ImageDimensions {
            path: sample.image_path.clone(),
        });
    }

    let mut lines = Vec::new();
    for annotation in &sample.record.annotations {
        let Some(species) = Species::from_name(&annotation.species) else {
            debug!(
                "Skipping box with unknown species '{}' on {}",
                annotation.species,
                sample.image_path.display()
            );
            report.skipped_unknown += 1;
            continue;
        };
        let Some(bbox) = pixel_box_from_annotation(&annotation.bbox, width, height) else {
            debug!(
                "Skipping malformed box {:?} on {}",
                annotation.bbox,
                sample.image_path.display()
            );
            report.skipped_unknown += 1;
            continue;
        };

        let norm = bbox.normalize(width, height);
        lines.push(format!(
            "{} {:.prec$} {:.prec$} {:.prec$} {:.prec$}",
            species.class_id(),
            norm.xc,
            norm.yc,
            norm.w,
            norm.h,
            prec = LABEL_DECIMAL_PLACES,
        ));
        *report
            .species_counts
            .entry(species.name().to_string())
            .or_insert(0) += 1;
        report.annotations_total += 1;
    }

    copy_image(dataset_dir, split, &sample.image_path)?;

    let contents = if lines.is_empty() {
        String::new()
    } else {
        let mut joined = lines.join("\n");
        joined.push('\n');
        joined
    };
    write_label_file(dataset_dir, split, &sample.image_path, contents)
}

/// Clamp an annotation's pixel corners into image bounds. Returns `None`
/// unless the box has exactly four elements.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_box_from_annotation(bbox: &[i64], width: u32, height: u32) -> Option<PixelBox> {
    let &[x1, y1, x2, y2] = bbox else {
        return None;
    };
    let clamp = |v: i64, limit: u32| -> u32 { v.clamp(0, i64::from(limit)) as u32 };
    let (a, b) = (clamp(x1, width), clamp(x2, width));
    let (c, d) = (clamp(y1, height), clamp(y2, height));
    Some(PixelBox {
        x1: a.min(b),
        y1: c.min(d),
        x2: a.max(b),
        y2: c.max(d),
    })
}

fn copy_image(dataset_dir: &Path, split: &str, image_path: &Path) -> Result<()> {
    let file_name = image_path.file_name().ok_or_else(|| Error::Internal {
        message: format!("image path without file name: {}", image_path.display()),
    })?;
    let target = dataset_dir.join(IMAGES_DIR).join(split).join(file_name);
    fs::copy(image_path, &target).map_err(|e| Error::ImageCopy {
        path: image_path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn write_label_file(
    dataset_dir: &Path,
    split: &str,
    image_path: &Path,
    contents: String,
) -> Result<()> {
    let stem = image_path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let target = dataset_dir
        .join(LABELS_DIR)
        .join(split)
        .join(format!("{stem}.txt"));
    fs::write(&target, contents).map_err(|e| Error::LabelWrite {
        path: target.clone(),
        source: e,
    })
}

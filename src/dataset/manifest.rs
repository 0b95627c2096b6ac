//! Dataset manifest generation.
//!
//! The manifest is the YAML file trainers read to locate the splits and the
//! class list. The format is small and fixed, so it is written directly
//! rather than through a serializer.

use crate::constants::dataset::{IMAGES_DIR, MANIFEST_FILENAME, TRAIN_SPLIT, VAL_SPLIT};
use crate::detect::taxonomy::Species;
use crate::error::Result;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `dataset.yaml` at the dataset root and return its path.
pub fn write_manifest(dataset_dir: &Path) -> Result<PathBuf> {
    let root = dataset_dir
        .canonicalize()
        .unwrap_or_else(|_| dataset_dir.to_path_buf());

    let mut contents = String::new();
    let _ = writeln!(contents, "path: {}", root.display());
    let _ = writeln!(contents, "train: {IMAGES_DIR}/{TRAIN_SPLIT}");
    let _ = writeln!(contents, "val: {IMAGES_DIR}/{VAL_SPLIT}");
    let _ = writeln!(contents, "nc: {}", Species::ALL.len());
    let _ = writeln!(contents, "names:");
    for species in Species::ALL {
        let _ = writeln!(contents, "  {}: {}", species.class_id(), species.name());
    }

    let manifest_path = dataset_dir.join(MANIFEST_FILENAME);
    fs::write(&manifest_path, contents)?;
    Ok(manifest_path)
}

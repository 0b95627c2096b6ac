//! Two-stage detection: primary detector plus species classification.

pub mod batch;
pub mod boxes;
pub mod classifier;
pub mod crop;
pub mod detector;
pub mod pipeline;
pub mod taxonomy;

pub use batch::{BatchReport, collect_images, run_batch};
pub use boxes::{Category, NormalizedBox, PixelBox, RelativeBox};
pub use classifier::{
    CommandDiscreteClassifier, CommandTaxonomyClassifier, DiscreteClassifier, DiscreteOutput,
    TaxonomyClassifier,
};
pub use detector::{CommandDetector, Detector, RawDetection};
pub use pipeline::{DetectionPipeline, PipelineOptions};
pub use taxonomy::{RankedTaxon, Resolution, Species, resolve_ranked, resolve_taxon};

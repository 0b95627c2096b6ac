//! Dataset export: reviewed annotations to a YOLO training layout.

pub mod export;
pub mod manifest;

pub use export::{ExportOptions, ExportOutcome, ExportReport, export_dataset};
pub use manifest::write_manifest;

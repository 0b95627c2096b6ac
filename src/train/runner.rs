//! Training orchestration.
//!
//! A training cycle exports the dataset, launches the external trainer
//! with the manifest path and records the outcome in the history file.
//! Model internals stay outside the crate; the trainer is an arbitrary
//! command.

use crate::config::Config;
use crate::dataset::{ExportOptions, ExportOutcome, ExportReport, export_dataset};
use crate::error::{Error, Result};
use crate::store::annotations::count_annotation_boxes;
use crate::train::history::{RetrainCheck, TrainingHistory, TrainingRun, current_hostname};
use crate::train::state;
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::info;

/// What a completed training run produced.
#[derive(Debug, Serialize)]
pub struct TrainReport {
    /// Name of the run.
    pub run_name: String,
    /// Annotated boxes in the store at launch time.
    pub annotation_count: usize,
    /// The dataset export behind the run.
    pub export: ExportReport,
}

/// Run a full training cycle: export, train, record.
///
/// Holds the process-wide training guard for the duration. A `base_model`
/// argument overrides the configured one. An empty export aborts with
/// [`Error::DatasetEmpty`] before the trainer is launched.
pub fn run_training(config: &Config, base_model: Option<&str>) -> Result<TrainReport> {
    if config.training.command.is_empty() {
        return Err(Error::TrainerNotConfigured);
    }

    let run_name = format!("species_{}", Utc::now().format("%Y%m%d_%H%M%S"));
    let _guard = state::begin(&run_name)?;

    let options = ExportOptions {
        val_fraction: config.export.val_fraction,
        seed: config.export.seed,
    };
    let export = match export_dataset(
        &config.annotations_dir(),
        &config.incoming_dir(),
        &config.dataset_dir(),
        &options,
    )? {
        ExportOutcome::Exported(report) => report,
        ExportOutcome::Empty { reason } => return Err(Error::DatasetEmpty { reason }),
    };

    let annotation_count = count_annotation_boxes(&config.annotations_dir())?;
    let base_model = base_model
        .map(str::to_string)
        .or_else(|| config.training.base_model.clone());

    info!("Starting training run {run_name} ({annotation_count} annotated boxes)");
    let status = invoke_trainer(
        &config.training.command,
        &export.manifest_path,
        base_model.as_deref(),
    )?;

    let history_path = config.history_path();
    let mut history = TrainingHistory::load(&history_path)?;
    history.runs.push(TrainingRun {
        timestamp: Utc::now(),
        base_model,
        annotation_count,
        hostname: current_hostname(),
        success: status.success(),
    });
    if status.success() {
        history.last_annotation_count = annotation_count;
    }
    history.save(&history_path)?;

    if status.success() {
        info!("Training run {run_name} finished");
        Ok(TrainReport {
            run_name,
            annotation_count,
            export,
        })
    } else {
        Err(Error::TrainerFailed {
            reason: format!("trainer exited with {status}"),
        })
    }
}

/// Check whether enough new annotations have accumulated to retrain.
pub fn check_retrain(config: &Config) -> Result<RetrainCheck> {
    let history = TrainingHistory::load(&config.history_path())?;
    let current = count_annotation_boxes(&config.annotations_dir())?;
    let min_new = config.training.min_new_annotations;
    Ok(RetrainCheck {
        current_annotations: current,
        last_annotation_count: history.last_annotation_count,
        new_annotations: current.saturating_sub(history.last_annotation_count),
        min_new_annotations: min_new,
        retrain_due: history.should_retrain(current, min_new),
    })
}

/// Launch the external trainer, inheriting stdio so its progress output
/// streams through.
fn invoke_trainer(
    command: &[String],
    manifest_path: &Path,
    base_model: Option<&str>,
) -> Result<ExitStatus> {
    let (program, args) = command.split_first().ok_or(Error::TrainerNotConfigured)?;
    let mut cmd = Command::new(program);
    cmd.args(args).arg(manifest_path);
    if let Some(model) = base_model {
        cmd.arg("--base-model").arg(model);
    }
    cmd.status().map_err(|e| Error::TrainerFailed {
        reason: format!("failed to launch trainer '{program}': {e}"),
    })
}

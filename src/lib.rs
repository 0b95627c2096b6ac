//! Camtrap - trail camera image triage CLI tool.
//!
//! Runs external detection and species classification over incoming camera
//! images, ranks predictions for human review, exports reviewed annotations
//! as a training dataset and orchestrates retraining.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod detect;
pub mod error;
pub mod review;
pub mod store;
pub mod train;

use clap::Parser;
use cli::{Cli, Command, ConfigAction};
use config::{Config, config_file_path, load_default_config, save_default_config, validate_config};
use dataset::{ExportOptions, ExportOutcome, export_dataset};
use detect::{
    CommandDetector, CommandDiscreteClassifier, CommandTaxonomyClassifier, DetectionPipeline,
    DiscreteClassifier, PipelineOptions, TaxonomyClassifier, run_batch,
};
use review::{collect_stats, uncertainty_ranking, write_queue_csv};
use std::path::{Path, PathBuf};
use tracing::warn;

pub use error::{Error, Result};

/// Main entry point for the camtrap CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    // Install Ctrl+C handler to clean up partially written predictions
    if let Err(e) = ctrlc::set_handler(|| {
        store::cleanup_temp_files();
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    match cli.command {
        Command::Config { action } => handle_config_command(action),
        Command::Detect {
            force,
            threshold,
            no_progress,
        } => {
            let config = load_runtime_config(cli.data_dir)?;
            handle_detect(
                &config,
                force,
                threshold,
                !no_progress && !cli.quiet,
            )
        }
        Command::Review { limit, output } => {
            let config = load_runtime_config(cli.data_dir)?;
            handle_review(&config, limit, output.as_deref())
        }
        Command::Stats => {
            let config = load_runtime_config(cli.data_dir)?;
            handle_stats(&config)
        }
        Command::Export { val_fraction, seed } => {
            let config = load_runtime_config(cli.data_dir)?;
            handle_export(&config, val_fraction, seed)
        }
        Command::Train {
            status,
            check,
            base_model,
        } => {
            let config = load_runtime_config(cli.data_dir)?;
            handle_train(&config, status, check, base_model.as_deref())
        }
    }
}

/// Load, override and validate configuration for data-facing commands.
fn load_runtime_config(data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = load_default_config()?;
    if let Some(data_dir) = data_dir {
        config.paths.data_dir = data_dir;
    }
    validate_config(&config)?;
    Ok(config)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).init();
}

/// Print a serializable value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| Error::Internal {
        message: format!("failed to render output: {e}"),
    })?;
    println!("{rendered}");
    Ok(())
}

/// Run the detection batch over the incoming image directory.
fn handle_detect(
    config: &Config,
    force: bool,
    threshold: Option<f32>,
    show_progress: bool,
) -> Result<()> {
    let detector = CommandDetector::new(config.detection.command.clone())?;
    let taxonomy = CommandTaxonomyClassifier::from_command(&config.classification.taxonomy_command);
    let discrete = CommandDiscreteClassifier::from_command(&config.classification.discrete_command);
    if taxonomy.is_none() && discrete.is_none() {
        warn!("No classifier configured; detections will carry category labels only");
    }

    let options = PipelineOptions {
        threshold: threshold.unwrap_or(config.detection.threshold),
        confidence_floor: config.classification.confidence_floor,
        top_k_alternatives: config.classification.top_k_alternatives,
    };
    let pipeline = DetectionPipeline::new(
        &detector,
        taxonomy.as_ref().map(|c| c as &dyn TaxonomyClassifier),
        discrete.as_ref().map(|c| c as &dyn DiscreteClassifier),
        options,
    );

    let report = run_batch(
        &pipeline,
        &config.incoming_dir(),
        &config.predictions_dir(),
        force,
        show_progress,
    )?;
    print_json(&report)
}

/// Print or write the uncertainty-ranked review queue.
fn handle_review(config: &Config, limit: Option<usize>, output: Option<&Path>) -> Result<()> {
    let limit = limit.unwrap_or(config.review.limit);
    let queue = uncertainty_ranking(
        &config.predictions_dir(),
        &config.annotations_dir(),
        &config.incoming_dir(),
        limit,
    )?;

    if let Some(path) = output {
        write_queue_csv(&queue, path)?;
        println!(
            "Review queue written to {} ({} entries)",
            path.display(),
            queue.len()
        );
        Ok(())
    } else {
        print_json(&queue)
    }
}

/// Print annotation and prediction statistics.
fn handle_stats(config: &Config) -> Result<()> {
    let stats = collect_stats(
        &config.incoming_dir(),
        &config.predictions_dir(),
        &config.annotations_dir(),
    )?;
    print_json(&stats)
}

/// Export reviewed annotations as a training dataset.
fn handle_export(config: &Config, val_fraction: Option<f32>, seed: Option<u64>) -> Result<()> {
    let options = ExportOptions {
        val_fraction: val_fraction.unwrap_or(config.export.val_fraction),
        seed: seed.unwrap_or(config.export.seed),
    };
    match export_dataset(
        &config.annotations_dir(),
        &config.incoming_dir(),
        &config.dataset_dir(),
        &options,
    )? {
        ExportOutcome::Exported(report) => print_json(&report),
        ExportOutcome::Empty { reason } => {
            println!("Nothing to export: {reason}");
            Ok(())
        }
    }
}

/// Run a training cycle, or report training state.
fn handle_train(config: &Config, status: bool, check: bool, base_model: Option<&str>) -> Result<()> {
    if status {
        return print_json(&train::status());
    }
    if check {
        return print_json(&train::check_retrain(config)?);
    }
    let report = train::run_training(config, base_model)?;
    print_json(&report)
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  set detection.command to your detector command");
                println!("  set paths.data_dir to your image data directory");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

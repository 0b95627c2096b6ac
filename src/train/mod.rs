//! Training orchestration: job state, run history and the trainer runner.

pub mod history;
pub mod runner;
pub mod state;

pub use history::{RetrainCheck, TrainingHistory, TrainingRun};
pub use runner::{TrainReport, check_retrain, run_training};
pub use state::{TrainingGuard, TrainingStatus, begin, status};

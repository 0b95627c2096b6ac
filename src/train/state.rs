//! Process-wide training job state.
//!
//! At most one training run may be active per process. [`begin`] flips the
//! state under a mutex and hands back an RAII guard; dropping the guard
//! returns the state to idle even when the run errors out partway.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{LazyLock, Mutex, PoisonError};

/// Snapshot of the training job state.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingStatus {
    /// Whether a run is active.
    pub running: bool,
    /// Start time of the active run.
    pub started_at: Option<DateTime<Utc>>,
    /// Name of the active run.
    pub run_name: Option<String>,
}

#[derive(Debug, Clone)]
struct ActiveRun {
    started_at: DateTime<Utc>,
    run_name: String,
}

/// `None` means idle.
static ACTIVE_RUN: LazyLock<Mutex<Option<ActiveRun>>> = LazyLock::new(|| Mutex::new(None));

/// Guard for an active training run. Dropping it marks the state idle.
pub struct TrainingGuard(());

/// Mark a training run as started.
///
/// Fails with [`Error::TrainingInProgress`] when another run is active;
/// the caller may retry once that run finishes.
pub fn begin(run_name: &str) -> Result<TrainingGuard> {
    let mut active = ACTIVE_RUN.lock().unwrap_or_else(PoisonError::into_inner);
    if active.is_some() {
        return Err(Error::TrainingInProgress);
    }
    *active = Some(ActiveRun {
        started_at: Utc::now(),
        run_name: run_name.to_string(),
    });
    Ok(TrainingGuard(()))
}

/// Snapshot the current job state.
pub fn status() -> TrainingStatus {
    let active = ACTIVE_RUN.lock().unwrap_or_else(PoisonError::into_inner);
    active.as_ref().map_or(
        TrainingStatus {
            running: false,
            started_at: None,
            run_name: None,
        },
        |run| TrainingStatus {
            running: true,
            started_at: Some(run.started_at),
            run_name: Some(run.run_name.clone()),
        },
    )
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        let mut active = ACTIVE_RUN.lock().unwrap_or_else(PoisonError::into_inner);
        *active = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(training_state)]
    fn test_begin_and_release() {
        assert!(!status().running);

        let guard = begin("species_test").unwrap();
        let snapshot = status();
        assert!(snapshot.running);
        assert_eq!(snapshot.run_name.as_deref(), Some("species_test"));
        assert!(snapshot.started_at.is_some());

        drop(guard);
        assert!(!status().running);
    }

    #[test]
    #[serial(training_state)]
    fn test_second_begin_rejected() {
        let _guard = begin("first").unwrap();
        assert!(matches!(begin("second"), Err(Error::TrainingInProgress)));
    }

    #[test]
    #[serial(training_state)]
    fn test_guard_releases_on_error_path() {
        {
            let _guard = begin("doomed").unwrap();
            // Simulates a run that bails early; the guard drops with scope.
        }
        assert!(begin("after").is_ok());
    }
}

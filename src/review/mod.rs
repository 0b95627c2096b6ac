//! Review queue and annotation statistics.

pub mod queue;
pub mod stats;

pub use queue::{ReviewCandidate, ReviewReason, uncertainty_ranking, write_queue_csv};
pub use stats::{AnnotationStats, collect_stats};

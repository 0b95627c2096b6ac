//! Configuration validation.

use crate::config::Config;
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_confidence("detection.threshold", config.detection.threshold)?;
    validate_confidence(
        "classification.confidence_floor",
        config.classification.confidence_floor,
    )?;

    if config.classification.top_k_alternatives == 0 {
        return Err(Error::ConfigValidation {
            message: "classification.top_k_alternatives must be at least 1".to_string(),
        });
    }

    if config.review.limit == 0 {
        return Err(Error::ConfigValidation {
            message: "review.limit must be at least 1".to_string(),
        });
    }

    let fraction = config.export.val_fraction;
    if !(0.0..1.0).contains(&fraction) {
        return Err(Error::ConfigValidation {
            message: format!("export.val_fraction must be at least 0 and below 1, got {fraction}"),
        });
    }

    Ok(())
}

/// Validate a confidence-like value.
fn validate_confidence(name: &str, value: f32) -> Result<()> {
    if (confidence::MIN..=confidence::MAX).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigValidation {
            message: format!(
                "{name} must be between {} and {}, got {value}",
                confidence::MIN,
                confidence::MAX
            ),
        })
    }
}

//! Primary detector seam.
//!
//! The detector model stays outside the crate: the shipped implementation
//! hands the image path to a configured external command and parses the JSON
//! it prints. Anything that scores boxes can stand behind the [`Detector`]
//! trait; tests use in-crate fakes.

use crate::detect::boxes::RelativeBox;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// One detector hit before any coordinate mapping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDetection {
    /// Box in relative coordinates.
    pub bbox: RelativeBox,
    /// Detector confidence in `[0, 1]`.
    pub conf: f32,
    /// Category code string, see
    /// [`Category::from_code`](crate::detect::boxes::Category::from_code).
    pub category: String,
}

/// Primary object detector.
pub trait Detector {
    /// Run detection on an image file at the given confidence threshold.
    ///
    /// Returns detections in model output order; an empty list is a valid
    /// result (nothing found).
    fn detect(&self, image: &Path, threshold: f32) -> Result<Vec<RawDetection>>;
}

/// Wire shape of the detector command output:
/// `{"detections": [{"bbox": [x,y,w,h], "conf": f, "category": "1"}]}`.
#[derive(Debug, Deserialize)]
struct DetectorResponse {
    detections: Vec<RawDetection>,
}

/// Detector backed by an external command.
///
/// Invoked as `<command> <fixed args..> <image-path> --threshold <t>`; the
/// command must print a [`DetectorResponse`] JSON document on stdout and exit
/// zero.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    command: Vec<String>,
}

impl CommandDetector {
    /// Build a detector from a configured command line.
    ///
    /// Fails with [`Error::DetectorUnavailable`] when no command is
    /// configured.
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::DetectorUnavailable {
                reason: "no detector command configured (set detection.command in config)"
                    .to_string(),
            });
        }
        Ok(Self { command })
    }
}

impl Detector for CommandDetector {
    fn detect(&self, image: &Path, threshold: f32) -> Result<Vec<RawDetection>> {
        debug!(
            "Running detector '{}' on {}",
            self.command[0],
            image.display()
        );

        let output = Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg(image)
            .arg("--threshold")
            .arg(threshold.to_string())
            .output()
            .map_err(|e| Error::DetectorUnavailable {
                reason: format!("failed to run '{}': {e}", self.command[0]),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::DetectionFailed {
                reason: format!(
                    "detector exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let response: DetectorResponse =
            serde_json::from_slice(&output.stdout).map_err(|e| Error::DetectionFailed {
                reason: format!("unparseable detector output: {e}"),
            })?;

        debug!(
            "Detector returned {} detections for {}",
            response.detections.len(),
            image.display()
        );
        Ok(response.detections)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_unavailable() {
        let result = CommandDetector::new(Vec::new());
        assert!(matches!(result, Err(Error::DetectorUnavailable { .. })));
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let detector =
            CommandDetector::new(vec!["/nonexistent/camtrap-detector-binary".to_string()])
                .unwrap();
        let result = detector.detect(Path::new("photo.jpg"), 0.2);
        assert!(matches!(result, Err(Error::DetectorUnavailable { .. })));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"detections": [
            {"bbox": [0.25, 0.25, 0.5, 0.5], "conf": 0.9, "category": "1"},
            {"bbox": [0.0, 0.0, 0.1, 0.1], "conf": 0.4, "category": "2"}
        ]}"#;
        let response: DetectorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.detections.len(), 2);
        assert_eq!(response.detections[0].category, "1");
        assert_eq!(response.detections[0].conf, 0.9);
        assert_eq!(response.detections[1].bbox.w, 0.1);
    }

    #[test]
    fn test_empty_detections_list_parses() {
        let response: DetectorResponse = serde_json::from_str(r#"{"detections": []}"#).unwrap();
        assert!(response.detections.is_empty());
    }
}

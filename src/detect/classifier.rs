//! Species classifier seams.
//!
//! Two classifier families can label an animal crop: the taxonomy classifier
//! speaks ranked open-vocabulary taxon strings, the discrete classifier
//! speaks class ids from the closed label set directly. Both stay outside the
//! crate as external commands that take a PNG crop on stdin and print JSON on
//! stdout.

use crate::detect::taxonomy::RankedTaxon;
use crate::error::{Error, Result};
use image::DynamicImage;
use serde::Deserialize;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Open-vocabulary species classifier.
pub trait TaxonomyClassifier {
    /// Classify a prepared crop, returning ranked predictions highest first.
    fn classify(&self, crop: &DynamicImage) -> Result<Vec<RankedTaxon>>;
}

/// Closed-set species classifier.
pub trait DiscreteClassifier {
    /// Classify a prepared crop.
    fn classify(&self, crop: &DynamicImage) -> Result<DiscreteOutput>;
}

/// Output of a discrete classifier run.
///
/// Classification-head models report one class with a confidence; detector
/// style models report per-box hits. The two wire shapes are disjoint, so an
/// untagged enum separates them at parse time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DiscreteOutput {
    /// Single class prediction: `{"class_id": n, "confidence": f}`.
    Classification {
        /// Class id in the closed label set.
        class_id: usize,
        /// Classifier confidence.
        confidence: f32,
    },
    /// Per-box predictions: `{"boxes": [{"class_id": n, "conf": f}, ...]}`.
    Detections {
        /// The predicted boxes.
        boxes: Vec<DiscreteBox>,
    },
}

/// One box-level prediction from a detector-style discrete classifier.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DiscreteBox {
    /// Class id in the closed label set.
    pub class_id: usize,
    /// Prediction confidence.
    pub conf: f32,
}

impl DiscreteOutput {
    /// The strongest class/confidence pair, or `None` when a detector-style
    /// run found nothing.
    #[must_use]
    pub fn best(&self) -> Option<(usize, f32)> {
        match self {
            Self::Classification {
                class_id,
                confidence,
            } => Some((*class_id, *confidence)),
            Self::Detections { boxes } => boxes
                .iter()
                .max_by(|a, b| a.conf.total_cmp(&b.conf))
                .map(|b| (b.class_id, b.conf)),
        }
    }
}

/// Wire shape of the taxonomy classifier output:
/// `{"classes": [["id;class;...;common name", score], ...]}`.
#[derive(Debug, Deserialize)]
struct TaxonomyResponse {
    classes: Vec<(String, f32)>,
}

/// Encode a crop as PNG for the classifier stdin contract.
fn encode_png(crop: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    crop.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Error::ClassifierFailed {
            reason: format!("failed to encode crop as PNG: {e}"),
        })?;
    Ok(buf)
}

/// Pipe `input` into a command and collect its stdout.
///
/// The input is fed from its own thread while this thread drains stdout, so
/// a child that emits more than a pipe buffer of output before reading its
/// stdin cannot wedge both ends.
fn run_stdin_command(command: &[String], input: Vec<u8>) -> Result<Vec<u8>> {
    let mut child = Command::new(&command[0])
        .args(&command[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::ClassifierFailed {
            reason: format!("failed to run '{}': {e}", command[0]),
        })?;

    // Dropping the handle after the write closes the pipe so the child sees
    // EOF.
    let writer = child
        .stdin
        .take()
        .map(|mut stdin| thread::spawn(move || stdin.write_all(&input)));

    let output = child
        .wait_with_output()
        .map_err(|e| Error::ClassifierFailed {
            reason: format!("failed to wait for '{}': {e}", command[0]),
        })?;

    // A child that exits before draining its stdin breaks the pipe; the
    // status check below reports that case.
    if let Some(handle) = writer
        && let Ok(Err(e)) = handle.join()
        && e.kind() != ErrorKind::BrokenPipe
    {
        return Err(Error::ClassifierFailed {
            reason: format!("failed to send crop to '{}': {e}", command[0]),
        });
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ClassifierFailed {
            reason: format!(
                "'{}' exited with {}: {}",
                command[0],
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(output.stdout)
}

/// Taxonomy classifier backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandTaxonomyClassifier {
    command: Vec<String>,
}

impl CommandTaxonomyClassifier {
    /// Build from a configured command line; `None` when not configured.
    #[must_use]
    pub fn from_command(command: &[String]) -> Option<Self> {
        if command.is_empty() {
            None
        } else {
            Some(Self {
                command: command.to_vec(),
            })
        }
    }
}

impl TaxonomyClassifier for CommandTaxonomyClassifier {
    fn classify(&self, crop: &DynamicImage) -> Result<Vec<RankedTaxon>> {
        let png = encode_png(crop)?;
        debug!(
            "Running taxonomy classifier '{}' ({} byte crop)",
            self.command[0],
            png.len()
        );
        let stdout = run_stdin_command(&self.command, png)?;
        let response: TaxonomyResponse =
            serde_json::from_slice(&stdout).map_err(|e| Error::ClassifierFailed {
                reason: format!("unparseable taxonomy classifier output: {e}"),
            })?;
        Ok(response
            .classes
            .into_iter()
            .map(|(taxon, score)| RankedTaxon { taxon, score })
            .collect())
    }
}

/// Discrete classifier backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandDiscreteClassifier {
    command: Vec<String>,
}

impl CommandDiscreteClassifier {
    /// Build from a configured command line; `None` when not configured.
    #[must_use]
    pub fn from_command(command: &[String]) -> Option<Self> {
        if command.is_empty() {
            None
        } else {
            Some(Self {
                command: command.to_vec(),
            })
        }
    }
}

impl DiscreteClassifier for CommandDiscreteClassifier {
    fn classify(&self, crop: &DynamicImage) -> Result<DiscreteOutput> {
        let png = encode_png(crop)?;
        debug!(
            "Running discrete classifier '{}' ({} byte crop)",
            self.command[0],
            png.len()
        );
        let stdout = run_stdin_command(&self.command, png)?;
        serde_json::from_slice(&stdout).map_err(|e| Error::ClassifierFailed {
            reason: format!("unparseable discrete classifier output: {e}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_response_parses_ranked_pairs() {
        let json = r#"{"classes": [
            ["uuid;mammalia;lagomorpha;leporidae;lepus;timidus;mountain hare", 0.7],
            ["uuid;mammalia;carnivora;canidae;vulpes;vulpes;red fox", 0.2]
        ]}"#;
        let response: TaxonomyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.classes.len(), 2);
        assert_eq!(response.classes[0].1, 0.7);
        assert!(response.classes[1].0.contains("vulpes"));
    }

    #[test]
    fn test_discrete_output_classification_shape() {
        let output: DiscreteOutput =
            serde_json::from_str(r#"{"class_id": 2, "confidence": 0.85}"#).unwrap();
        assert_eq!(output.best(), Some((2, 0.85)));
    }

    #[test]
    fn test_discrete_output_boxes_shape() {
        let output: DiscreteOutput = serde_json::from_str(
            r#"{"boxes": [
                {"class_id": 5, "conf": 0.3},
                {"class_id": 2, "conf": 0.6},
                {"class_id": 0, "conf": 0.5}
            ]}"#,
        )
        .unwrap();
        assert_eq!(output.best(), Some((2, 0.6)));
    }

    #[test]
    fn test_discrete_output_empty_boxes_has_no_best() {
        let output: DiscreteOutput = serde_json::from_str(r#"{"boxes": []}"#).unwrap();
        assert_eq!(output.best(), None);
    }

    #[test]
    fn test_from_command_requires_a_command() {
        assert!(CommandTaxonomyClassifier::from_command(&[]).is_none());
        assert!(CommandDiscreteClassifier::from_command(&[]).is_none());
        assert!(
            CommandTaxonomyClassifier::from_command(&["classify".to_string()]).is_some()
        );
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_bulk_output_before_reading_stdin_completes() {
        // 128 KiB each way, more than a pipe buffer in both directions. A
        // child that fills stdout before touching stdin must still finish.
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "head -c 131072 /dev/zero; cat > /dev/null; printf ok".to_string(),
        ];
        let stdout = run_stdin_command(&command, vec![0u8; 131_072]).unwrap();
        assert_eq!(stdout.len(), 131_072 + 2);
        assert!(stdout.ends_with(b"ok"));
    }

    #[test]
    fn test_missing_binary_fails() {
        let classifier = CommandTaxonomyClassifier::from_command(&[
            "/nonexistent/camtrap-classifier-binary".to_string(),
        ])
        .unwrap();
        let crop = DynamicImage::new_rgb8(4, 4);
        let result = classifier.classify(&crop);
        assert!(matches!(result, Err(Error::ClassifierFailed { .. })));
    }
}

//! Multi-strategy OCR with confidence-based fallback.

mod backend;
mod engine;

#[cfg(feature = "paddle")]
mod paddle;

#[cfg(feature = "tesseract")]
mod tesseract;

pub use backend::{BackendKind, FailureCode, OcrBackend};
pub use engine::{ImageInput, Strategy, TextExtractionEngine};

#[cfg(feature = "paddle")]
pub use paddle::PaddleBackend;

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractBackend;

use serde::{Deserialize, Serialize};

/// One recognized text line with its source geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDetection {
    /// Recognized text content.
    pub text: String,

    /// Source quadrilateral, four `[x, y]` points.
    #[serde(rename = "box")]
    pub quad: [[f32; 2]; 4],

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Axis-aligned `[x, y, w, h]` rectangle collapsed from `quad`.
    pub bbox: [i32; 4],
}

impl LineDetection {
    /// Build a detection, deriving the rectangle from the quadrilateral.
    pub fn new(text: String, quad: [[f32; 2]; 4], confidence: f32) -> Self {
        let bbox = quad_to_bbox(&quad);
        Self {
            text,
            quad,
            confidence,
            bbox,
        }
    }
}

/// Collapse a quadrilateral to an axis-aligned `[x, y, w, h]` rectangle.
///
/// Coordinates are truncated to integers, and width/height are measured
/// from the truncated corner. The simplification is lossy and downstream
/// consumers depend on exactly this form.
pub fn quad_to_bbox(quad: &[[f32; 2]; 4]) -> [i32; 4] {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for point in quad {
        min_x = min_x.min(point[0]);
        min_y = min_y.min(point[1]);
        max_x = max_x.max(point[0]);
        max_y = max_y.max(point[1]);
    }

    let x = min_x as i32;
    let y = min_y as i32;
    let w = (max_x - x as f32) as i32;
    let h = (max_y - y as f32) as i32;

    [x, y, w, h]
}

/// Result of transcribing one image with one backend.
///
/// Immutable once constructed. A failed backend call still yields a
/// transcription: zero confidence, empty text, and a failure-code tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    /// Backend tag (`paddle`, `tesseract`) or failure code
    /// (`paddle_error`, `tesseract_no_text`, ...).
    pub method: String,

    /// Mean of per-line confidences; 0.0 when there are no lines.
    pub confidence: f32,

    /// Recognized lines joined with newlines.
    pub text: String,

    /// Per-line detections in reading order.
    pub lines: Vec<LineDetection>,
}

impl Transcription {
    /// Build a transcription from recognized lines.
    ///
    /// An empty line set degrades to the backend's `no_text` tag.
    pub fn from_lines(kind: BackendKind, lines: Vec<LineDetection>) -> Self {
        if lines.is_empty() {
            return Self::failed(kind, FailureCode::NoText);
        }

        let confidence =
            lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32;
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            method: kind.tag().to_string(),
            confidence,
            text,
            lines,
        }
    }

    /// Build a zero-confidence transcription tagged with a failure code.
    pub fn failed(kind: BackendKind, code: FailureCode) -> Self {
        Self {
            method: format!("{}_{}", kind.tag(), code.tag()),
            confidence: 0.0,
            text: String::new(),
            lines: Vec::new(),
        }
    }

    /// Number of recognized lines.
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quad_to_bbox_truncates() {
        let quad = [[10.7, 20.9], [110.2, 21.3], [110.9, 45.1], [10.1, 44.8]];
        // x = trunc(10.1) = 10, w = trunc(110.9 - 10) = 100
        assert_eq!(quad_to_bbox(&quad), [10, 20, 100, 25]);
    }

    #[test]
    fn test_quad_to_bbox_degenerate() {
        assert_eq!(quad_to_bbox(&[[0.0, 0.0]; 4]), [0, 0, 0, 0]);
    }

    #[test]
    fn test_confidence_is_mean_of_lines() {
        let lines = vec![
            LineDetection::new("a".to_string(), [[0.0, 0.0]; 4], 0.8),
            LineDetection::new("b".to_string(), [[0.0, 0.0]; 4], 0.4),
        ];
        let t = Transcription::from_lines(BackendKind::Paddle, lines);
        assert!((t.confidence - 0.6).abs() < 1e-6);
        assert_eq!(t.text, "a\nb");
        assert_eq!(t.method, "paddle");
        assert_eq!(t.num_lines(), 2);
    }

    #[test]
    fn test_empty_lines_become_no_text() {
        let t = Transcription::from_lines(BackendKind::Paddle, Vec::new());
        assert_eq!(t.method, "paddle_no_text");
        assert_eq!(t.confidence, 0.0);
        assert!(t.text.is_empty());
    }

    #[test]
    fn test_failure_tags() {
        let t = Transcription::failed(BackendKind::Tesseract, FailureCode::BackendError);
        assert_eq!(t.method, "tesseract_error");
        let t = Transcription::failed(BackendKind::Paddle, FailureCode::Unavailable);
        assert_eq!(t.method, "paddle_unavailable");
    }
}

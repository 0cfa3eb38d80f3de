//! Primary OCR backend over `pure-onnx-ocr` (PaddleOCR model family).

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::backend::{BackendKind, OcrBackend};
use super::{LineDetection, Transcription};

/// Detection + recognition backend running PaddleOCR ONNX models.
pub struct PaddleBackend {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl PaddleBackend {
    /// Load the detection/recognition models named in the configuration
    /// from `model_dir`.
    pub fn from_dir(model_dir: &Path, config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&config.detection_model);
        let rec_path = model_dir.join(&config.recognition_model);
        let dict_path = model_dir.join(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::BackendInit(format!(
                    "missing model file: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::BackendInit(format!("pure-onnx-ocr: {}", e)))?;

        info!("loaded paddle models from {}", model_dir.display());

        Ok(Self { engine })
    }
}

impl OcrBackend for PaddleBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Paddle
    }

    fn attempt(&self, image: &DynamicImage) -> Result<Transcription, OcrError> {
        let detections = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Backend(format!("pure-onnx-ocr: {}", e)))?;

        debug!("paddle returned {} text regions", detections.len());

        let mut lines: Vec<LineDetection> = detections
            .iter()
            .map(|d| {
                LineDetection::new(
                    d.text.replace("[UNK]", " "),
                    polygon_to_quad(&d.bounding_box),
                    d.confidence,
                )
            })
            .collect();

        // Reading order: rows of ~20px top-to-bottom, then left-to-right.
        lines.sort_by(|a, b| {
            let row_a = a.bbox[1] / 20;
            let row_b = b.bbox[1] / 20;
            if row_a != row_b {
                row_a.cmp(&row_b)
            } else {
                a.bbox[0].cmp(&b.bbox[0])
            }
        });

        Ok(Transcription::from_lines(BackendKind::Paddle, lines))
    }
}

/// First four exterior points of the detection polygon as a quadrilateral.
fn polygon_to_quad(polygon: &pure_onnx_ocr::Polygon<f64>) -> [[f32; 2]; 4] {
    let mut quad = [[0.0f32; 2]; 4];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        quad[i] = [coord.x as f32, coord.y as f32];
    }
    quad
}

//! Secondary OCR backend over Tesseract via `leptess`.

use std::io::Cursor;
use std::sync::Mutex;

use image::DynamicImage;
use tracing::debug;

use crate::error::OcrError;

use super::backend::{BackendKind, OcrBackend};
use super::{LineDetection, Transcription};

/// Whole-page recognition backend using a local Tesseract installation.
///
/// The Tesseract API is stateful, so calls are serialized through a mutex.
pub struct TesseractBackend {
    api: Mutex<leptess::LepTess>,
}

impl TesseractBackend {
    /// Initialize Tesseract with the system data path and the given
    /// language.
    pub fn new(lang: &str) -> Result<Self, OcrError> {
        let api = leptess::LepTess::new(None, lang)
            .map_err(|e| OcrError::BackendInit(format!("tesseract: {}", e)))?;

        Ok(Self {
            api: Mutex::new(api),
        })
    }
}

impl OcrBackend for TesseractBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tesseract
    }

    fn attempt(&self, image: &DynamicImage) -> Result<Transcription, OcrError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| OcrError::Backend(format!("encode: {}", e)))?;

        let mut api = self
            .api
            .lock()
            .map_err(|_| OcrError::Backend("tesseract mutex poisoned".to_string()))?;

        api.set_image_from_mem(&png)
            .map_err(|e| OcrError::Backend(format!("tesseract: {}", e)))?;

        let text = api
            .get_utf8_text()
            .map_err(|e| OcrError::Backend(format!("tesseract: {}", e)))?;
        let confidence = (api.mean_text_conf() as f32 / 100.0).clamp(0.0, 1.0);

        debug!("tesseract mean confidence {:.2}", confidence);

        // This interface exposes no per-line geometry; lines carry the
        // page-level confidence and a degenerate quadrilateral.
        let lines: Vec<LineDetection> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| LineDetection::new(line.to_string(), [[0.0, 0.0]; 4], confidence))
            .collect();

        Ok(Transcription::from_lines(BackendKind::Tesseract, lines))
    }
}

//! OCR backend capability interface.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

use super::Transcription;

/// The closed set of OCR backend implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// PaddleOCR-style detection + recognition models.
    Paddle,
    /// Tesseract whole-page recognition.
    Tesseract,
}

impl BackendKind {
    /// Lowercase tag used in method fields and failure codes.
    pub fn tag(&self) -> &'static str {
        match self {
            BackendKind::Paddle => "paddle",
            BackendKind::Tesseract => "tesseract",
        }
    }
}

/// Why a backend produced no usable transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    /// The backend ran but recognized nothing.
    NoText,
    /// The backend raised an internal error.
    BackendError,
    /// The requested backend was not configured.
    Unavailable,
}

impl FailureCode {
    /// Suffix appended to the backend tag.
    pub fn tag(&self) -> &'static str {
        match self {
            FailureCode::NoText => "no_text",
            FailureCode::BackendError => "error",
            FailureCode::Unavailable => "unavailable",
        }
    }
}

/// Trait for OCR backends.
///
/// Backends are selected by configuration; the fallback algorithm in
/// [`super::TextExtractionEngine`] never needs to change when a new
/// variant is added to the set.
pub trait OcrBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Transcribe one image.
    ///
    /// An `Err` here is a per-call condition; the engine converts it into
    /// a zero-confidence transcription rather than propagating it.
    fn attempt(&self, image: &DynamicImage) -> Result<Transcription, OcrError>;
}

//! Text-extraction engine selecting among OCR backends.

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::backend::{BackendKind, FailureCode, OcrBackend};
use super::Transcription;

/// Raster input in any of the accepted forms.
///
/// Every form is normalized into one decoded image before dispatch.
pub enum ImageInput<'a> {
    /// Path to an image file on disk.
    Path(&'a Path),
    /// Encoded image bytes.
    Bytes(&'a [u8]),
    /// An already-decoded image.
    Image(DynamicImage),
}

impl ImageInput<'_> {
    fn into_image(self) -> Result<DynamicImage, OcrError> {
        match self {
            ImageInput::Path(path) => image::open(path)
                .map_err(|e| OcrError::InvalidImage(format!("{}: {}", path.display(), e))),
            ImageInput::Bytes(bytes) => image::load_from_memory(bytes)
                .map_err(|e| OcrError::InvalidImage(e.to_string())),
            ImageInput::Image(image) => Ok(image),
        }
    }
}

impl<'a> From<&'a Path> for ImageInput<'a> {
    fn from(path: &'a Path) -> Self {
        ImageInput::Path(path)
    }
}

impl<'a> From<&'a [u8]> for ImageInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<DynamicImage> for ImageInput<'_> {
    fn from(image: DynamicImage) -> Self {
        ImageInput::Image(image)
    }
}

/// Backend selection strategy for one extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Primary backend, with a confidence-gated secondary fallback.
    Auto,
    /// Exactly one backend, no fallback.
    Only(BackendKind),
}

/// Engine selecting among OCR backends.
///
/// The backend list is ordered: the first entry is the primary for the
/// auto strategy, the second its fallback. Only one backend's result is
/// ever returned; results are never merged.
pub struct TextExtractionEngine {
    backends: Vec<Box<dyn OcrBackend>>,
    fallback_threshold: f32,
}

impl TextExtractionEngine {
    /// Create an engine over the given backends.
    ///
    /// Fails with [`OcrError::NoBackendAvailable`] when the list is empty.
    pub fn new(
        backends: Vec<Box<dyn OcrBackend>>,
        fallback_threshold: f32,
    ) -> Result<Self, OcrError> {
        if backends.is_empty() {
            return Err(OcrError::NoBackendAvailable);
        }

        info!(
            "OCR engine ready: {}",
            backends
                .iter()
                .map(|b| b.kind().tag())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            backends,
            fallback_threshold,
        })
    }

    /// Probe every compiled-in backend and build an engine from the ones
    /// that initialize.
    ///
    /// A backend that fails to initialize is skipped with a warning; if
    /// none initialize the engine cannot be constructed.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        #[allow(unused_mut)]
        let mut backends: Vec<Box<dyn OcrBackend>> = Vec::new();

        #[cfg(feature = "paddle")]
        match super::PaddleBackend::from_dir(&config.model_dir, config) {
            Ok(backend) => backends.push(Box::new(backend)),
            Err(e) => warn!("paddle backend unavailable: {}", e),
        }

        #[cfg(feature = "tesseract")]
        match super::TesseractBackend::new(&config.tesseract_lang) {
            Ok(backend) => backends.push(Box::new(backend)),
            Err(e) => warn!("tesseract backend unavailable: {}", e),
        }

        Self::new(backends, config.fallback_threshold)
    }

    /// Kinds of the configured backends, in priority order.
    pub fn backend_kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Transcribe one image with the given strategy.
    ///
    /// Backend failures never surface as errors here; only an undecodable
    /// input does.
    pub fn extract(
        &self,
        input: ImageInput<'_>,
        strategy: Strategy,
    ) -> Result<Transcription, OcrError> {
        let image = input.into_image()?;

        Ok(match strategy {
            Strategy::Auto => self.extract_auto(&image),
            Strategy::Only(kind) => self.run_backend(kind, &image),
        })
    }

    fn extract_auto(&self, image: &DynamicImage) -> Transcription {
        let primary = &self.backends[0];
        let mut result = attempt_isolated(primary.as_ref(), image);

        if result.confidence < self.fallback_threshold {
            if let Some(secondary) = self.backends.get(1) {
                debug!(
                    "low confidence ({:.2}), trying {} fallback",
                    result.confidence,
                    secondary.kind().tag()
                );
                let fallback = attempt_isolated(secondary.as_ref(), image);
                // Ties keep the primary result.
                if fallback.confidence > result.confidence {
                    result = fallback;
                }
            }
        }

        result
    }

    fn run_backend(&self, kind: BackendKind, image: &DynamicImage) -> Transcription {
        match self.backends.iter().find(|b| b.kind() == kind) {
            Some(backend) => attempt_isolated(backend.as_ref(), image),
            None => Transcription::failed(kind, FailureCode::Unavailable),
        }
    }
}

fn attempt_isolated(backend: &dyn OcrBackend, image: &DynamicImage) -> Transcription {
    match backend.attempt(image) {
        Ok(transcription) => transcription,
        Err(e) => {
            warn!("{} backend failed: {}", backend.kind().tag(), e);
            Transcription::failed(backend.kind(), FailureCode::BackendError)
        }
    }
}

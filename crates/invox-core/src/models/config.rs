//! Configuration structures for the invox pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::InvoxError;

/// Main configuration for the invox pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoxConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Structured-extraction configuration.
    pub extraction: ExtractionConfig,

    /// Export configuration.
    pub export: ExportConfig,
}

impl Default for InvoxConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            extraction: ExtractionConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing OCR model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Aggregate confidence below which the auto strategy consults the
    /// secondary backend.
    pub fallback_threshold: f32,

    /// Language passed to the Tesseract backend.
    pub tesseract_lang: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "rec.onnx".to_string(),
            dictionary: "dict.txt".to_string(),
            fallback_threshold: 0.70,
            tesseract_lang: "eng".to_string(),
        }
    }
}

/// Structured-extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Base URL of the OpenAI-compatible completion endpoint.
    pub api_base: String,

    /// Model identifier.
    pub model: String,

    /// Maximum number of sequential extraction attempts per document.
    pub max_retries: u32,

    /// OCR text beyond this many characters is never sent.
    pub max_prompt_chars: usize,

    /// Output token ceiling for the completion request.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Seconds to wait between requests when processing a batch.
    pub request_delay_secs: u64,

    /// File that receives the raw reply after an unrecoverable parse
    /// failure.
    pub debug_dump: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_base: invox_llm::DEFAULT_API_BASE.to_string(),
            model: invox_llm::DEFAULT_MODEL.to_string(),
            max_retries: 3,
            max_prompt_chars: 4000,
            max_tokens: 4096,
            temperature: 0.0,
            request_delay_secs: 2,
            debug_dump: PathBuf::from("debug_failed_response.txt"),
        }
    }
}

/// Stage output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving per-document OCR JSON files.
    pub stage1_dir: PathBuf,

    /// Directory receiving per-document extraction JSON files.
    pub stage2_dir: PathBuf,

    /// Directory receiving the normalized CSV tables.
    pub csv_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            stage1_dir: PathBuf::from("stage1_output"),
            stage2_dir: PathBuf::from("stage2_output"),
            csv_dir: PathBuf::from("stage3_csv"),
        }
    }
}

impl InvoxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, InvoxError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| InvoxError::Config(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), InvoxError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| InvoxError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InvoxConfig::default();
        assert_eq!(config.ocr.fallback_threshold, 0.70);
        assert_eq!(config.extraction.max_retries, 3);
        assert_eq!(config.extraction.max_prompt_chars, 4000);
        assert_eq!(config.extraction.max_tokens, 4096);
        assert_eq!(config.extraction.request_delay_secs, 2);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invox.json");

        let mut config = InvoxConfig::default();
        config.extraction.model = "test-model".to_string();
        config.save(&path).unwrap();

        let loaded = InvoxConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.model, "test-model");
        assert_eq!(loaded.ocr.detection_model, "det.onnx");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"extraction": {"max_retries": 5}}"#).unwrap();

        let config = InvoxConfig::from_file(&path).unwrap();
        assert_eq!(config.extraction.max_retries, 5);
        assert_eq!(config.ocr.fallback_threshold, 0.70);
    }
}

//! On-disk document formats shared by the pipeline stages.

use serde::{Deserialize, Serialize};

use invox_core::models::record::InvoiceRecord;
use invox_core::ocr::{LineDetection, Transcription};

/// Per-document stage-1 output file.
#[derive(Debug, Serialize, Deserialize)]
pub struct Stage1Document {
    pub metadata: Stage1Metadata,
    pub ocr: OcrReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stage1Metadata {
    pub filename: String,
    pub file_path: String,
    pub processed_at: String,
    pub processing_time_ms: u64,
    pub image_size: [u32; 2],
}

/// Serialized transcription block.
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrReport {
    pub method: String,
    pub confidence: f32,
    pub num_lines: usize,
    pub text: String,
    pub line_level_data: Vec<LineDetection>,
}

impl From<Transcription> for OcrReport {
    fn from(transcription: Transcription) -> Self {
        Self {
            method: transcription.method,
            confidence: transcription.confidence,
            num_lines: transcription.lines.len(),
            text: transcription.text,
            line_level_data: transcription.lines,
        }
    }
}

/// Stage-1 batch summary file.
#[derive(Debug, Serialize, Deserialize)]
pub struct Stage1Summary {
    pub batch_info: BatchInfo,
    pub results: Vec<DocumentStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchInfo {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time_ms: u64,
    pub avg_time_ms: u64,
    pub processed_at: String,
}

/// Per-document status line in a batch summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub file: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-document stage-2 output file.
#[derive(Debug, Serialize, Deserialize)]
pub struct Stage2Document {
    pub metadata: Stage2Metadata,
    pub invoice_data: Stage2Payload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stage2Metadata {
    pub source_file: String,
    pub stage1_confidence: f32,
    pub processed_at: String,
}

/// Either the extracted record or an error block.
///
/// The error variant is listed first so deserialization cannot mistake an
/// error block for a (fully optional) record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stage2Payload {
    Error(Stage2Error),
    Record(InvoiceRecord),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stage2Error {
    pub error: String,
    pub extracted: bool,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage2_payload_roundtrips_records() {
        let json = r#"{"invoice_number": "1001", "line_items": []}"#;
        let payload: Stage2Payload = serde_json::from_str(json).unwrap();
        assert!(matches!(payload, Stage2Payload::Record(_)));
    }

    #[test]
    fn test_stage2_payload_recognizes_errors() {
        let json = r#"{"error": "boom", "extracted": false, "timestamp": "t"}"#;
        let payload: Stage2Payload = serde_json::from_str(json).unwrap();
        assert!(matches!(payload, Stage2Payload::Error(_)));
    }
}

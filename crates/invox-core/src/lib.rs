//! Core library for scanned-invoice processing.
//!
//! This crate provides:
//! - Multi-strategy OCR with confidence-based two-tier fallback
//! - Structured field extraction through a text-completion service,
//!   with repair of malformed replies and a bounded retry budget
//! - Relational normalization of extracted records into tabular rows

pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod store;

pub use error::{InvoxError, OcrError, ParseFailure, Result, StoreError};
pub use extract::StructuredExtractionEngine;
pub use models::config::InvoxConfig;
pub use models::record::{
    Amounts, ExtractionFailure, ExtractionOutcome, FailureReason, InvoiceRecord, LineItem,
    Numeric, PartyRecord,
};
pub use ocr::{
    BackendKind, ImageInput, LineDetection, OcrBackend, Strategy, TextExtractionEngine,
    Transcription,
};
pub use store::{IngestOutcome, NormalizationStore};

/// Re-export the completion-service seam.
pub use invox_llm::{CompletionService, GroqClient, ServiceError};

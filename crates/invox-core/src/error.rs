//! Error types for the invox-core library.

use thiserror::Error;

/// Main error type for the invox library.
#[derive(Error, Debug)]
pub enum InvoxError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Normalization store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Completion service error.
    #[error("completion service error: {0}")]
    Service(#[from] invox_llm::ServiceError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// No OCR backend could be initialized. Fatal at construction time:
    /// this is a broken deployment, not a per-document condition.
    #[error("no OCR backend available")]
    NoBackendAvailable,

    /// A backend failed to initialize.
    #[error("failed to initialize backend: {0}")]
    BackendInit(String),

    /// A backend failed while processing one image.
    #[error("backend failed: {0}")]
    Backend(String),

    /// The input could not be decoded into an image.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Failure to recover a structured record from a model reply.
#[derive(Error, Debug)]
pub enum ParseFailure {
    /// The reply was empty or whitespace-only.
    #[error("empty response")]
    Empty,

    /// No candidate span parsed as JSON.
    #[error("JSON parse error: {detail}")]
    Unparsable { detail: String, excerpt: String },

    /// A span parsed, but no anchor key was present at the top level.
    #[error("no anchor key in recovered object")]
    MissingAnchor { excerpt: String },

    /// The recovered JSON did not match the invoice record shape.
    #[error("reply shape mismatch: {0}")]
    Shape(String),
}

/// Errors related to relational normalization.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The record carries no line items and cannot produce valid rows.
    #[error("record has no line items")]
    NoLineItems,

    /// A required party is missing from the record.
    #[error("record is missing {0}")]
    MissingParty(&'static str),
}

/// Result type for the invox library.
pub type Result<T> = std::result::Result<T, InvoxError>;

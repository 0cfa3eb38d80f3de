//! Error types for the completion-service layer.

use thiserror::Error;

/// Errors that can occur when talking to a completion service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The reply was well-formed but carried no choices.
    #[error("reply contained no choices")]
    EmptyReply,
}

//! Text-completion service abstraction for invox.
//!
//! This crate provides a unified seam for synchronous request/response text
//! completion so the extraction layer can run against the production
//! OpenAI-compatible endpoint or a scripted stand-in in tests.

mod client;
mod error;

pub use client::{GroqClient, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use error::ServiceError;

use std::future::Future;

/// Result type for completion operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Trait for text-completion backends.
///
/// One call sends a system instruction plus a user prompt and yields the
/// model's single textual reply.
pub trait CompletionService: Send + Sync {
    /// Request one completion for the given system/user message pair.
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

extern crate alloc;

use async_trait::async_trait;
use thiserror::Error;

pub mod advice;
pub mod cli;
pub mod config;
pub mod repl;
pub mod services;
pub mod topic;
pub mod ui;

/// A single prompt submission to a completion service.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRequest<'req> {
    pub model: &'req str,
    pub prompt: &'req str,
}

impl<'req> CompletionRequest<'req> {
    #[inline]
    #[must_use]
    pub const fn new(model: &'req str, prompt: &'req str) -> Self {
        Self { model, prompt }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("Model overloaded: {0}")]
    ModelOverloaded(String),
    #[error("Response was blocked: {0}.")]
    Blocked(String),
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Network error: {0}.")]
    NetworkError(String),
    #[error("Unexpected response: {0}.")]
    UnexpectedResponse(String),
}

/// A backend that turns a prompt into generated text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<String, ServiceError>;
}

//! Trait seam between the engine and the completion service.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::LlmError;

/// Ordered text chunks terminated by end-of-stream or a single error.
pub type ChunkStream = BoxStream<'static, Result<String, LlmError>>;

/// One prompt headed for the completion service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Inline reference image as a data URL.
    pub image: Option<String>,
    /// Ask the service for a machine-parseable JSON body.
    pub expect_json: bool,
}

impl CompletionRequest {
    #[must_use]
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), image: None, expect_json: false }
    }

    #[must_use]
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    #[must_use]
    pub fn expecting_json(mut self) -> Self {
        self.expect_json = true;
        self
    }
}

/// Backend-agnostic completion service.
///
/// The engine schedules jobs against this trait; tests substitute mock
/// implementations with scripted chunks and failures.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Single-shot call returning the full response text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Streaming call yielding ordered text chunks.
    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError>;
}

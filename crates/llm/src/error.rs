//! Typed error enum for the LLM crate.

use pageforge_core::ForgeError;
use thiserror::Error;

/// Errors from completion-service operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("HTTP status {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("stream failed: {0}")]
    Stream(String),
    #[error("JSON parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("empty response: no choices returned")]
    EmptyResponse,
    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

impl LlmError {
    /// Whether this error is transient and eligible for a scheduler retry.
    ///
    /// Timeouts surface as `HttpRequest`; mid-stream drops as `Stream`.
    /// Both can succeed on a fresh attempt. Parse and auth failures cannot.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpRequest(_) | Self::Stream(_) => true,
            Self::HttpStatus { code, .. } => matches!(code, 429 | 500 | 502 | 503 | 529),
            _ => false,
        }
    }
}

impl From<LlmError> for ForgeError {
    fn from(err: LlmError) -> Self {
        Self::Completion(err.to_string())
    }
}

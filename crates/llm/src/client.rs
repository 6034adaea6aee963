use async_trait::async_trait;
use futures_util::StreamExt;
use pageforge_core::{env_parse_with_default, DEFAULT_FETCH_TIMEOUT_SECS};

use crate::error::LlmError;
use crate::service::{ChunkStream, CompletionRequest, CompletionService};
use crate::types::{
    ChatRequest, ChatResponse, ContentPart, ImageUrl, Message, MessageContent, ResponseFormat,
    StreamChunk,
};

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gemini-3-flash";

/// Client for the completion-service API.
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("client", &self.client)
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmClient {
    /// Creates a new client with the given API key and base URL.
    ///
    /// The fetch timeout is configured once here (`PAGEFORGE_TIMEOUT_SECS`,
    /// default 30s) and bounds every call, streaming included. A timed-out
    /// call surfaces as a transport error and settles its job as `error`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(api_key: String, base_url: String) -> Result<Self, LlmError> {
        let model = std::env::var("PAGEFORGE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        let timeout_secs: u64 =
            env_parse_with_default("PAGEFORGE_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS);
        let base_url = base_url.trim_end_matches('/').to_owned();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::ClientInit(e.to_string()))?;
        Ok(Self { client, api_key, base_url, model })
    }

    /// Sets a custom model for this client.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_request(&self, request: &CompletionRequest, stream: bool) -> ChatRequest {
        let content = match &request.image {
            Some(image) => MessageContent::Parts(vec![
                ContentPart::Text { text: request.prompt.clone() },
                ContentPart::ImageUrl { image_url: ImageUrl { url: image.clone() } },
            ]),
            None => MessageContent::Text(request.prompt.clone()),
        };
        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message { role: "user".to_owned(), content }],
            response_format: request
                .expect_json
                .then(|| ResponseFormat { format_type: "json_object".to_owned() }),
            stream,
        }
    }

    async fn post(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.chat_request(request, stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_owned());
            return Err(LlmError::HttpStatus { code: status.as_u16(), body });
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self.post(request, false).await?;
        let body = response.text().await?;

        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::JsonParse {
                context: format!("chat completion response (body: {})", truncate(&body, 200)),
                source: e,
            })?;

        let first_choice = chat_response.choices.first().ok_or(LlmError::EmptyResponse)?;
        Ok(first_choice.message.content.clone())
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        let response = self.post(request, true).await?;
        tracing::debug!(model = %self.model, "streaming completion opened");
        let mut bytes = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buf: Vec<u8> = Vec::new();
            let mut done = false;
            while let Some(next) = bytes.next().await {
                let chunk = next.map_err(LlmError::HttpRequest)?;
                buf.extend_from_slice(&chunk);
                // Drain complete SSE events; a multibyte char never spans
                // an event boundary, so lossy decoding per event is safe.
                while let Some(pos) = buf.windows(2).position(|w| w == b"\n\n") {
                    let event: Vec<u8> = buf.drain(..pos + 2).collect();
                    let text = String::from_utf8_lossy(&event[..pos]).into_owned();
                    for line in text.lines() {
                        let Some(data) = line.strip_prefix("data:") else { continue };
                        let data = data.trim();
                        if data == "[DONE]" {
                            done = true;
                            break;
                        }
                        let frame: StreamChunk = serde_json::from_str(data)
                            .map_err(|e| LlmError::Stream(format!("malformed stream frame: {e}")))?;
                        let delta = frame.choices.first().and_then(|c| c.delta.content.clone());
                        if let Some(content) = delta {
                            if !content.is_empty() {
                                yield content;
                            }
                        }
                    }
                    if done {
                        break;
                    }
                }
                if done {
                    break;
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Truncates a string to the given maximum length at a char boundary.
#[must_use]
pub(crate) fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}

//! Publishing backend boundary.
//!
//! The engine hands a finalized artifact's content to a backend and
//! attaches the returned public URL; it does not implement hosting.

use async_trait::async_trait;
use chrono::Utc;
use pageforge_core::{ForgeError, PublishInfo, Result};
use serde::{Deserialize, Serialize};

/// Metadata accompanying a publish request.
#[derive(Debug, Clone, Serialize)]
pub struct PublishMetadata {
    pub title: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait PublishBackend: Send + Sync {
    /// Publish finalized content; returns the public URL and short id.
    async fn publish(&self, content: &str, metadata: &PublishMetadata) -> Result<PublishInfo>;
}

/// HTTP implementation posting to a configured publishing endpoint.
pub struct HttpPublishBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    content: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Deserialize)]
struct PublishResponse {
    url: String,
    short_id: String,
}

impl HttpPublishBackend {
    pub fn new(api_key: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                pageforge_core::DEFAULT_FETCH_TIMEOUT_SECS,
            ))
            .build()
            .map_err(|e| ForgeError::Publish(format!("client initialization failed: {e}")))?;
        Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_owned() })
    }
}

#[async_trait]
impl PublishBackend for HttpPublishBackend {
    async fn publish(&self, content: &str, metadata: &PublishMetadata) -> Result<PublishInfo> {
        let request = PublishRequest {
            content,
            title: &metadata.title,
            description: metadata.description.as_deref(),
        };
        let response = self
            .client
            .post(format!("{}/v1/sites", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ForgeError::Publish(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ForgeError::Publish(e.to_string()))?;
        if !status.is_success() {
            return Err(ForgeError::Publish(format!("backend returned {status}: {body}")));
        }

        let parsed: PublishResponse = serde_json::from_str(&body)
            .map_err(|e| ForgeError::Publish(format!("malformed backend response: {e}")))?;
        Ok(PublishInfo { url: parsed.url, short_id: parsed.short_id, published_at: Utc::now() })
    }
}

//! Embedding provider for OpenAI-compatible `/v1/embeddings` endpoints.
//!
//! Works against the OpenAI API as well as self-hosted servers that speak the
//! same protocol (for example a text-embeddings-inference server running
//! `sentence-transformers/all-MiniLM-L6-v2`).
//!
//! This module is only available when the `http` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::EmbeddingServiceConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "OpenAI-compatible";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new(EmbeddingServiceConfig::from_env()?)?;
/// let vectors = provider.embed_batch(&["hello world"]).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from service configuration.
    ///
    /// The HTTP client enforces the configured per-request timeout.
    pub fn new(config: EmbeddingServiceConfig) -> Result<Self> {
        let client = build_client(config.timeout)
            .map_err(|e| RagError::embedding(PROVIDER, format!("failed to build client: {e}")))?;
        Ok(Self { client, url: config.url, api_key: config.api_key, model: config.model })
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }
}

pub(crate) fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

// ── request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: ErrorDetail,
}

#[derive(Deserialize)]
pub(crate) struct ErrorDetail {
    pub(crate) message: String,
}

/// Put response items back in request order when the server reports indices.
fn into_ordered(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let mut request =
            self.client.post(&self.url).json(&EmbeddingRequest { model: &self.model, input: texts });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            let reason = if e.is_timeout() { "request timed out" } else { "request failed" };
            RagError::embedding(PROVIDER, format!("{reason}: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::embedding(PROVIDER, format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::embedding(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(RagError::embedding(
                PROVIDER,
                format!("malformed response: {} embeddings for {} inputs", parsed.data.len(), texts.len()),
            ));
        }

        Ok(into_ordered(parsed.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_items_are_reordered() {
        let data = vec![
            EmbeddingData { index: Some(1), embedding: vec![2.0] },
            EmbeddingData { index: Some(0), embedding: vec![1.0] },
        ];
        assert_eq!(into_ordered(data), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn unindexed_items_keep_response_order() {
        let data = vec![
            EmbeddingData { index: None, embedding: vec![2.0] },
            EmbeddingData { index: Some(0), embedding: vec![1.0] },
        ];
        assert_eq!(into_ordered(data), vec![vec![2.0], vec![1.0]]);
    }

    #[test]
    fn response_parses_openai_shape() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.5]}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(into_ordered(parsed.data), vec![vec![0.5, -0.5]]);
    }
}

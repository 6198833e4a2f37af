//! Inference client for OpenAI-compatible chat completion endpoints.
//!
//! Defaults target Groq (`https://api.groq.com/openai/v1/chat/completions`),
//! but any server that speaks the chat completions protocol works.
//!
//! This module is only available when the `http` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::InferenceServiceConfig;
use crate::error::{RagError, Result};
use crate::inference::{Completion, CompletionRequest, InferenceService};
use crate::openai::{ErrorResponse, build_client};

const PROVIDER: &str = "Groq";

/// An [`InferenceService`] backed by a chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::groq::ChatCompletionsClient;
///
/// let client = ChatCompletionsClient::new(InferenceServiceConfig::from_env()?, "llama3-70b-8192")?;
/// let completion = client.complete(CompletionRequest::new("Hello")).await?;
/// ```
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    /// Create a client that sends every request to `model`.
    pub fn new(config: InferenceServiceConfig, model: impl Into<String>) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RagError::Config("inference API key must not be empty".into()));
        }
        let client = build_client(config.timeout)
            .map_err(|e| RagError::inference(PROVIDER, format!("failed to build client: {e}")))?;
        Ok(Self { client, url: config.url, api_key: config.api_key, model: model.into() })
    }
}

// ── request/response types ──────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessageIn<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessageIn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessageOut>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessageOut {
    #[serde(default = "assistant_role")]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

fn assistant_role() -> String {
    "assistant".to_string()
}

/// Normalize the first choice into a [`Completion`].
fn normalize(response: ChatResponse) -> Result<Completion> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RagError::inference(PROVIDER, "malformed response: no choices"))?;

    match (choice.message, choice.text) {
        (Some(ChatMessageOut { role, content: Some(content) }), _) => {
            Ok(Completion::Message { role, content })
        }
        (_, Some(text)) => Ok(Completion::Text { text }),
        _ => Err(RagError::inference(PROVIDER, "malformed response: choice has no content")),
    }
}

#[async_trait]
impl InferenceService for ChatCompletionsClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_len = request.prompt.len(),
            "sending completion request"
        );

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessageIn { role: "user", content: &request.prompt }],
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                let reason = if e.is_timeout() { "request timed out" } else { "request failed" };
                RagError::inference(PROVIDER, format!("{reason}: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::inference(PROVIDER, format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::inference(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        normalize(parsed)
    }
}

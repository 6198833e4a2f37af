//! Language-model inference service trait and normalized response type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single prompt sent to an inference backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// The full prompt text.
    pub prompt: String,
    /// Upper bound on generated tokens, if the caller wants one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a request with backend defaults for every setting.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), max_tokens: None }
    }

    /// Set the generated-token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A backend response, normalized at the client boundary.
///
/// Chat-style backends return a structured message, while completion-style
/// backends return bare text. Call sites only ever use [`Completion::text`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// A structured chat message.
    Message {
        /// Author role reported by the backend (usually `assistant`).
        role: String,
        /// Message body.
        content: String,
    },
    /// Raw generated text.
    Text {
        /// Generated text.
        text: String,
    },
}

impl Completion {
    /// The generated text, whatever shape the backend used.
    pub fn text(&self) -> &str {
        match self {
            Self::Message { content, .. } => content,
            Self::Text { text } => text,
        }
    }

    /// Consume the completion and return its text.
    pub fn into_text(self) -> String {
        match self {
            Self::Message { content, .. } => content,
            Self::Text { text } => text,
        }
    }
}

/// A language-model backend that turns a prompt into generated text.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{CompletionRequest, InferenceService};
///
/// let completion = service.complete(CompletionRequest::new("Say hi")).await?;
/// println!("{}", completion.text());
/// ```
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Generate a completion for the request.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_shapes_expose_text() {
        let message = Completion::Message { role: "assistant".into(), content: "Paris".into() };
        let text = Completion::Text { text: "Paris".into() };
        assert_eq!(message.text(), text.text());
        assert_eq!(message.into_text(), "Paris");
    }

    #[test]
    fn request_skips_unset_settings() {
        let json = serde_json::to_value(CompletionRequest::new("hi").with_max_tokens(5)).unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "hi", "max_tokens": 5}));
    }
}

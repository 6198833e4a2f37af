//! Document summarization, independent of the vector index.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{RagError, Result, Stage};
use crate::inference::{CompletionRequest, InferenceService};

const INSTRUCTION: &str =
    "Summarize the following document in 5-7 lines, highlighting key points in simple language:";

/// Cut `text` to at most `budget` characters before it is sent anywhere.
///
/// Prefers to end at the last sentence terminator (`.`, `!`, `?` followed by
/// whitespace) inside the budget, as long as that keeps at least half of it;
/// otherwise cuts at the character boundary.
pub fn truncate_for_summary(text: &str, budget: usize) -> &str {
    let cut = match text.char_indices().nth(budget) {
        Some((byte, _)) => byte,
        None => return text,
    };
    let prefix = &text[..cut];

    let sentence_end = prefix
        .char_indices()
        .filter(|&(byte, c)| {
            let after = byte + c.len_utf8();
            matches!(c, '.' | '!' | '?')
                && text[after..].chars().next().is_none_or(char::is_whitespace)
        })
        .map(|(byte, c)| byte + c.len_utf8())
        .last();

    match sentence_end {
        Some(end) if prefix[..end].chars().count() * 2 >= budget => &prefix[..end],
        _ => prefix,
    }
}

/// Produces a short abstractive summary of a whole document.
#[derive(Clone)]
pub struct Summarizer {
    inference: Arc<dyn InferenceService>,
    budget_chars: usize,
    max_tokens: u32,
    timeout: Duration,
}

impl Summarizer {
    /// Create a summarizer that sends at most `budget_chars` of the document.
    pub fn new(
        inference: Arc<dyn InferenceService>,
        budget_chars: usize,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self { inference, budget_chars, max_tokens, timeout }
    }

    /// The prompt that would be sent for `text`.
    pub fn prompt(&self, text: &str) -> String {
        format!("{INSTRUCTION}\n\n{}", truncate_for_summary(text, self.budget_chars))
    }

    /// Summarize `text`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for blank text (no call is made) and
    /// [`RagError::InferenceService`] tagged [`Stage::Summarize`] on backend
    /// failure or timeout.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(RagError::Validation("cannot summarize an empty document".to_string()));
        }

        let prompt = self.prompt(text);
        debug!(model = self.inference.model(), prompt_chars = prompt.len(), "summarizing document");

        let request = CompletionRequest::new(prompt).with_max_tokens(self.max_tokens);
        let completion = tokio::time::timeout(self.timeout, self.inference.complete(request))
            .await
            .map_err(|_| {
                RagError::inference(
                    self.inference.name(),
                    format!("request timed out after {:?}", self.timeout),
                )
            })
            .and_then(|result| result)
            .map_err(|e| e.at_stage(Stage::Summarize))?;

        Ok(completion.into_text().trim().to_string())
    }
}

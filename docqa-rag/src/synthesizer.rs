//! Grounded answer synthesis.
//!
//! Retrieved segments are "stuffed" into a single prompt in ranked order,
//! followed by the question. When the prompt would exceed the inference
//! input limit, the lowest-ranked segments are dropped first.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::document::{Answer, RetrievalResult, ScoredSegment};
use crate::error::{RagError, Result, Stage};
use crate::inference::{CompletionRequest, InferenceService};

const INSTRUCTION: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Answer returned without calling the backend when nothing was retrieved.
pub const NO_CONTEXT_ANSWER: &str =
    "I don't know. The document does not contain any text to answer from.";

/// A prompt together with the segments that made it in.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPlan {
    /// The full prompt text.
    pub prompt: String,
    /// Segments included, best first.
    pub included: Vec<ScoredSegment>,
    /// Number of lowest-ranked segments left out.
    pub dropped: usize,
    /// Whether the top segment was cut short to fit on its own.
    pub truncated: bool,
}

/// Build the answer prompt, keeping it within `max_chars` characters.
///
/// Segments are added best first; the first segment that does not fit ends
/// the context, so everything ranked below it is dropped as well. A top
/// segment that is larger than the whole budget is cut to a prefix that fits,
/// so the context is never empty while there is room for any of it.
///
/// # Errors
///
/// Returns [`RagError::Validation`] if the instruction and question alone
/// exceed `max_chars`.
pub fn build_prompt(
    question: &str,
    results: &RetrievalResult,
    max_chars: usize,
) -> Result<PromptPlan> {
    let frame = |context: &str| {
        format!("{INSTRUCTION}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
    };

    let mut used = frame("").chars().count();
    if used > max_chars {
        return Err(RagError::Validation(format!(
            "question is too long for the inference input limit ({max_chars} characters)"
        )));
    }

    let mut included = Vec::new();
    for result in results {
        let separator = if included.is_empty() { 0 } else { CONTEXT_SEPARATOR.len() };
        let cost = separator + result.segment.text.chars().count();
        if used + cost > max_chars {
            break;
        }
        used += cost;
        included.push(result.clone());
    }

    let mut truncated = false;
    if included.is_empty() {
        let budget = max_chars - used;
        if let Some(top) = results.first().filter(|_| budget > 0) {
            let mut top = top.clone();
            if let Some((cut, _)) = top.segment.text.char_indices().nth(budget) {
                top.segment.text.truncate(cut);
            }
            truncated = true;
            included.push(top);
        }
    }

    let context =
        included.iter().map(|r| r.segment.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
    let dropped = results.len() - included.len();
    Ok(PromptPlan { prompt: frame(&context), included, dropped, truncated })
}

/// Composes retrieved segments and a question into a grounded answer.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    inference: Arc<dyn InferenceService>,
    max_context_chars: usize,
    max_tokens: u32,
    timeout: Duration,
}

impl AnswerSynthesizer {
    /// Create a synthesizer that sends prompts to `inference`.
    pub fn new(
        inference: Arc<dyn InferenceService>,
        max_context_chars: usize,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self { inference, max_context_chars, max_tokens, timeout }
    }

    /// Generate an answer to `question` grounded in `results`.
    ///
    /// With no retrieved segments there is nothing to ground an answer in, so
    /// [`NO_CONTEXT_ANSWER`] is returned without calling the backend.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InferenceService`] on backend failure or timeout,
    /// and [`RagError::Validation`] if the question cannot fit the limit.
    pub async fn synthesize(&self, question: &str, results: RetrievalResult) -> Result<Answer> {
        if results.is_empty() {
            info!("no segments retrieved, skipping inference");
            return Ok(Answer { text: NO_CONTEXT_ANSWER.to_string(), sources: Vec::new(), dropped: 0 });
        }

        let plan = build_prompt(question, &results, self.max_context_chars)?;
        if plan.included.is_empty() {
            warn!(
                limit = self.max_context_chars,
                "no room for any context within the inference input limit, skipping inference"
            );
            return Ok(Answer {
                text: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                dropped: plan.dropped,
            });
        }
        if plan.truncated {
            warn!(
                limit = self.max_context_chars,
                "top segment exceeds inference input limit, truncating it"
            );
        }
        if plan.dropped > 0 {
            warn!(
                dropped = plan.dropped,
                kept = plan.included.len(),
                limit = self.max_context_chars,
                "context exceeds inference input limit, dropping lowest-ranked segments"
            );
        }
        debug!(model = self.inference.model(), prompt_chars = plan.prompt.len(), "synthesizing answer");

        let request = CompletionRequest::new(plan.prompt).with_max_tokens(self.max_tokens);
        let completion = tokio::time::timeout(self.timeout, self.inference.complete(request))
            .await
            .map_err(|_| {
                RagError::inference(
                    self.inference.name(),
                    format!("request timed out after {:?}", self.timeout),
                )
            })
            .and_then(|result| result)
            .map_err(|e| e.at_stage(Stage::Synthesize))?;

        Ok(Answer { text: completion.into_text(), sources: plan.included, dropped: plan.dropped })
    }
}

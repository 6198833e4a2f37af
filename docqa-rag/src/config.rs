//! Configuration for the pipeline and its backing services.
//!
//! Every value can be injected through `DOCQA_*` environment variables;
//! credentials are only ever read from the environment.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default OpenAI-compatible embeddings endpoint (a local embeddings server).
pub const DEFAULT_EMBEDDING_URL: &str = "http://127.0.0.1:8080/v1/embeddings";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Default chat completions endpoint.
pub const DEFAULT_INFERENCE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default model used to answer questions.
pub const DEFAULT_ANSWER_MODEL: &str = "llama3-70b-8192";
/// Default model used to summarize documents.
pub const DEFAULT_SUMMARY_MODEL: &str = "llama3-8b-8192";

/// Configuration parameters for chunking, retrieval, and generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Separator the chunker splits on.
    pub separator: String,
    /// Maximum segment size in characters.
    pub chunk_size: usize,
    /// Maximum number of characters shared by consecutive segments.
    pub chunk_overlap: usize,
    /// Number of segments retrieved per question when the caller does not say.
    pub top_k: usize,
    /// Inference input limit, in characters, for the answer prompt.
    pub max_context_chars: usize,
    /// Characters of the document sent for summarization.
    pub summary_chars: usize,
    /// Largest accepted document, in characters.
    pub max_document_chars: usize,
    /// Largest accepted question, in characters.
    pub max_question_chars: usize,
    /// Segments per embedding call.
    pub embedding_batch_size: usize,
    /// Embedding calls in flight during an index build.
    pub embedding_concurrency: usize,
    /// Token limit for generated answers and summaries.
    pub max_tokens: u32,
    /// Deadline applied to every embedding and inference call.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            max_context_chars: 24_000,
            summary_chars: 5000,
            max_document_chars: 2_000_000,
            max_question_chars: 2000,
            embedding_batch_size: 64,
            embedding_concurrency: 4,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load configuration from `DOCQA_*` environment variables.
    ///
    /// Unset variables keep their defaults. The separator accepts `\n`, `\t`
    /// and `\r` escapes so it can be written on a single line.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a variable does not parse or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Self::builder()
            .chunk_size(env_or("DOCQA_CHUNK_SIZE", defaults.chunk_size)?)
            .chunk_overlap(env_or("DOCQA_CHUNK_OVERLAP", defaults.chunk_overlap)?)
            .top_k(env_or("DOCQA_TOP_K", defaults.top_k)?)
            .max_context_chars(env_or("DOCQA_MAX_CONTEXT_CHARS", defaults.max_context_chars)?)
            .summary_chars(env_or("DOCQA_SUMMARY_CHARS", defaults.summary_chars)?)
            .max_document_chars(env_or("DOCQA_MAX_DOCUMENT_CHARS", defaults.max_document_chars)?)
            .max_question_chars(env_or("DOCQA_MAX_QUESTION_CHARS", defaults.max_question_chars)?)
            .embedding_batch_size(env_or("DOCQA_EMBEDDING_BATCH", defaults.embedding_batch_size)?)
            .embedding_concurrency(env_or(
                "DOCQA_EMBEDDING_CONCURRENCY",
                defaults.embedding_concurrency,
            )?)
            .max_tokens(env_or("DOCQA_MAX_TOKENS", defaults.max_tokens)?)
            .timeout(Duration::from_secs(env_or("DOCQA_TIMEOUT_SECS", 30u64)?));
        if let Some(separator) = env_string("DOCQA_SEPARATOR") {
            builder = builder.separator(unescape(&separator));
        }
        builder.build()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.config.separator = separator.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of segments retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the answer prompt size limit in characters.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set how many document characters are sent for summarization.
    pub fn summary_chars(mut self, chars: usize) -> Self {
        self.config.summary_chars = chars;
        self
    }

    /// Set the largest accepted document in characters.
    pub fn max_document_chars(mut self, chars: usize) -> Self {
        self.config.max_document_chars = chars;
        self
    }

    /// Set the largest accepted question in characters.
    pub fn max_question_chars(mut self, chars: usize) -> Self {
        self.config.max_question_chars = chars;
        self
    }

    /// Set the number of segments per embedding call.
    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    /// Set the number of concurrent embedding calls during a build.
    pub fn embedding_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embedding_concurrency = concurrency;
        self
    }

    /// Set the generated-token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the deadline for every external call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - the separator is empty
    /// - any size budget, batch size, concurrency, or the timeout is zero
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if config.separator.is_empty() {
            return Err(RagError::Config("separator must not be empty".to_string()));
        }
        let positive = [
            ("max_context_chars", config.max_context_chars),
            ("summary_chars", config.summary_chars),
            ("max_document_chars", config.max_document_chars),
            ("max_question_chars", config.max_question_chars),
            ("embedding_batch_size", config.embedding_batch_size),
            ("embedding_concurrency", config.embedding_concurrency),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(RagError::Config(format!("{name} must be greater than zero")));
        }
        if config.max_tokens == 0 || config.timeout.is_zero() {
            return Err(RagError::Config("max_tokens and timeout must be non-zero".to_string()));
        }
        Ok(config)
    }
}

/// Connection settings for the embedding service.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingServiceConfig {
    /// Embeddings endpoint URL.
    pub url: String,
    /// Embedding model identifier.
    pub model: String,
    /// Bearer credential; local servers usually need none.
    pub api_key: Option<String>,
    /// Per-request deadline.
    pub timeout: Duration,
}

impl EmbeddingServiceConfig {
    /// Load from `DOCQA_EMBEDDING_URL`, `DOCQA_EMBEDDING_MODEL`,
    /// `DOCQA_EMBEDDING_API_KEY` (falling back to `OPENAI_API_KEY`) and
    /// `DOCQA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: env_string("DOCQA_EMBEDDING_URL").unwrap_or_else(|| DEFAULT_EMBEDDING_URL.into()),
            model: env_string("DOCQA_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            api_key: env_string("DOCQA_EMBEDDING_API_KEY").or_else(|| env_string("OPENAI_API_KEY")),
            timeout: Duration::from_secs(env_or("DOCQA_TIMEOUT_SECS", 30u64)?),
        })
    }
}

/// Connection settings for the inference service.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceServiceConfig {
    /// Chat completions endpoint URL.
    pub url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Model used for answers.
    pub answer_model: String,
    /// Model used for summaries.
    pub summary_model: String,
    /// Per-request deadline.
    pub timeout: Duration,
}

impl InferenceServiceConfig {
    /// Load from `DOCQA_INFERENCE_URL`, `GROQ_API_KEY`, `DOCQA_ANSWER_MODEL`,
    /// `DOCQA_SUMMARY_MODEL` and `DOCQA_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `GROQ_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = env_string("GROQ_API_KEY")
            .ok_or_else(|| RagError::Config("GROQ_API_KEY environment variable not set".into()))?;
        Ok(Self {
            url: env_string("DOCQA_INFERENCE_URL").unwrap_or_else(|| DEFAULT_INFERENCE_URL.into()),
            api_key,
            answer_model: env_string("DOCQA_ANSWER_MODEL")
                .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.into()),
            summary_model: env_string("DOCQA_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.into()),
            timeout: Duration::from_secs(env_or("DOCQA_TIMEOUT_SECS", 30u64)?),
        })
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RagError::Config(format!("{name}={raw:?} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\t", "\t").replace("\\r", "\r")
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn zero_budgets_are_rejected() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().summary_chars(0).build().is_err());
        assert!(RagConfig::builder().separator("").build().is_err());
        assert!(RagConfig::builder().timeout(Duration::ZERO).build().is_err());
    }

    #[test]
    fn escaped_separators_are_decoded() {
        assert_eq!(unescape("\\n\\n"), "\n\n");
        assert_eq!(unescape(". "), ". ");
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = serde_json::to_value(RagConfig::default()).unwrap();
        assert_eq!(json["timeout"], 30);
        let back: RagConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, RagConfig::default());
    }
}

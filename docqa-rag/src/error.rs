//! Error types for the `docqa-rag` crate.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The pipeline stage that produced an error.
///
/// Callers use the stage to decide whether retrying that stage alone is
/// enough (for example, re-running retrieval without rebuilding the index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Turning an uploaded artifact into raw text.
    Extract,
    /// Checking caller input before any external call.
    Validate,
    /// Embedding segments during index construction.
    Embed,
    /// Building or querying the vector index.
    Index,
    /// Embedding a question and searching the index.
    Retrieve,
    /// Generating a grounded answer.
    Synthesize,
    /// Generating a document summary.
    Summarize,
}

impl Stage {
    /// Stable lowercase name, as used in logs and API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Validate => "validate",
            Self::Embed => "embed",
            Self::Index => "index",
            Self::Retrieve => "retrieve",
            Self::Synthesize => "synthesize",
            Self::Summarize => "summarize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error classification, independent of the producing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unsupported or corrupt input document.
    Extraction,
    /// The embedding backend failed, timed out, or returned malformed output.
    EmbeddingService,
    /// The inference backend failed, timed out, or returned malformed output.
    InferenceService,
    /// Embeddings disagree in count or dimensionality.
    DimensionMismatch,
    /// Empty or oversized caller input.
    Validation,
    /// Invalid configuration.
    Config,
}

/// Errors that can occur in document QA operations.
///
/// Errors are `Clone` so that a single failed index build can be observed by
/// every caller that was waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RagError {
    /// The uploaded document could not be turned into text.
    #[error("Extraction error: {message}")]
    Extraction {
        /// A description of the failure.
        message: String,
    },

    /// An error occurred calling the embedding service.
    #[error("Embedding service error during {stage} ({provider}): {message}")]
    EmbeddingService {
        /// The stage that issued the embedding call.
        stage: Stage,
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred calling the inference service.
    #[error("Inference service error during {stage} ({provider}): {message}")]
    InferenceService {
        /// The stage that issued the inference call.
        stage: Stage,
        /// The inference provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Embedding count or dimensionality was inconsistent.
    #[error("Dimension mismatch during {stage}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// The stage that detected the mismatch.
        stage: Stage,
        /// The expected length.
        expected: usize,
        /// The length that was actually observed.
        found: usize,
    },

    /// Caller input was rejected before any external call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// Shorthand for an embedding failure raised by a provider.
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingService {
            stage: Stage::Embed,
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an inference failure raised by a provider.
    pub fn inference(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InferenceService {
            stage: Stage::Synthesize,
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an extraction failure.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction { message: message.into() }
    }

    /// Return the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::EmbeddingService { .. } => ErrorKind::EmbeddingService,
            Self::InferenceService { .. } => ErrorKind::InferenceService,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Return the stage that produced this error, if it is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Extraction { .. } => Some(Stage::Extract),
            Self::EmbeddingService { stage, .. }
            | Self::InferenceService { stage, .. }
            | Self::DimensionMismatch { stage, .. } => Some(*stage),
            Self::Validation(_) => Some(Stage::Validate),
            Self::Config(_) => None,
        }
    }

    /// Re-tag a service or dimension error with the stage that observed it.
    ///
    /// Errors without a mutable stage are returned unchanged.
    pub fn at_stage(mut self, new_stage: Stage) -> Self {
        match &mut self {
            Self::EmbeddingService { stage, .. }
            | Self::InferenceService { stage, .. }
            | Self::DimensionMismatch { stage, .. } => *stage = new_stage,
            _ => {}
        }
        self
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Only backend failures are retryable; the crate never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::EmbeddingService | ErrorKind::InferenceService)
    }
}

/// A convenience result type for document QA operations.
pub type Result<T> = std::result::Result<T, RagError>;

//! # docqa-rag
//!
//! Single-document retrieval question answering.
//!
//! ## Overview
//!
//! One uploaded document is split into overlapping segments, each segment is
//! embedded, and the vectors are held in an in-memory [`VectorIndex`].
//! Questions are embedded the same way, the most similar segments are
//! retrieved, and a language model answers from that context only. A
//! separate [`Summarizer`] produces a short summary of the whole document
//! without touching the index.
//!
//! - [`SeparatorChunker`] - separator-aware sliding-window splitting
//! - [`EmbeddingProvider`] - text → vector service seam
//! - [`VectorIndex`] - exact cosine-similarity search
//! - [`Retriever`] - question → top-k segments
//! - [`AnswerSynthesizer`] - grounded answers from retrieved context
//! - [`QaPipeline`] / [`DocumentSession`] - orchestration and index memoization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docqa_rag::testing::{BagOfWordsEmbedder, GroundedInference};
//! use docqa_rag::{Document, QaPipeline};
//!
//! # async fn run() -> docqa_rag::Result<()> {
//! let pipeline = Arc::new(
//!     QaPipeline::builder()
//!         .embedding_provider(Arc::new(BagOfWordsEmbedder::new(64)))
//!         .answer_inference(Arc::new(GroundedInference::new()))
//!         .build()?,
//! );
//!
//! let session = pipeline.open(Document::new("Paris is the capital of France."))?;
//! let answer = session.ask("What is the capital of France?", None).await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `http` (default) - OpenAI-compatible embedding and chat-completions clients
//! - `pdf` (default) - PDF text extraction

pub mod analysis;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
#[cfg(feature = "http")]
pub mod groq;
pub mod index;
pub mod inference;
#[cfg(feature = "http")]
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod session;
pub mod summarizer;
pub mod synthesizer;
pub mod testing;

pub use analysis::{
    DocumentAnalysis, DocumentStats, LexiconSentimentScorer, Sentiment, SentimentLabel,
    SentimentScorer,
};
pub use chunking::{Chunker, SeparatorChunker};
pub use config::{EmbeddingServiceConfig, InferenceServiceConfig, RagConfig, RagConfigBuilder};
pub use document::{Answer, Document, RetrievalResult, ScoredSegment, Segment};
pub use embedding::{BatchPlan, EmbeddingProvider, embed_all};
pub use error::{ErrorKind, RagError, Result, Stage};
pub use extract::{FileKind, extract_text};
#[cfg(feature = "http")]
pub use groq::ChatCompletionsClient;
pub use index::VectorIndex;
pub use inference::{Completion, CompletionRequest, InferenceService};
#[cfg(feature = "http")]
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{QaPipeline, QaPipelineBuilder};
pub use retriever::Retriever;
pub use session::{DocumentSession, IndexStatus};
pub use summarizer::Summarizer;
pub use synthesizer::{AnswerSynthesizer, NO_CONTEXT_ANSWER};

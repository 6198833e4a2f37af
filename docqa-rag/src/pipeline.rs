//! Document QA pipeline orchestrator.
//!
//! The [`QaPipeline`] composes a [`Chunker`], an [`EmbeddingProvider`], and
//! [`InferenceService`]s into the three downstream operations: build an
//! index for a document, answer a question against an index, and summarize a
//! document.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{Document, QaPipeline, RagConfig};
//!
//! let pipeline = QaPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .answer_inference(Arc::new(my_llm))
//!     .build()?;
//!
//! let document = Document::new("Paris is the capital of France.");
//! let index = pipeline.build_index(&document).await?;
//! let answer = pipeline.ask(&index, "What is the capital of France?", None).await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{error, info};

use crate::analysis::{DocumentAnalysis, LexiconSentimentScorer, SentimentScorer};
use crate::chunking::{Chunker, SeparatorChunker};
use crate::config::RagConfig;
use crate::document::{Answer, Document};
use crate::embedding::{BatchPlan, EmbeddingProvider, embed_all};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::inference::InferenceService;
use crate::retriever::Retriever;
use crate::session::DocumentSession;
use crate::summarizer::Summarizer;
use crate::synthesizer::AnswerSynthesizer;

/// The document QA pipeline.
///
/// Holds only injected service handles and configuration; per-document state
/// lives in [`DocumentSession`]. Construct one via [`QaPipeline::builder()`].
pub struct QaPipeline {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    summarizer: Summarizer,
    sentiment: Arc<dyn SentimentScorer>,
}

impl QaPipeline {
    /// Create a new [`QaPipelineBuilder`].
    pub fn builder() -> QaPipelineBuilder {
        QaPipelineBuilder::default()
    }

    /// Build a pipeline against the HTTP services described by the
    /// environment (see [`RagConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if configuration is missing or invalid.
    #[cfg(feature = "http")]
    pub fn from_env() -> Result<Self> {
        use crate::config::{EmbeddingServiceConfig, InferenceServiceConfig};
        use crate::groq::ChatCompletionsClient;
        use crate::openai::OpenAIEmbeddingProvider;

        let config = RagConfig::from_env()?;
        let embedding = OpenAIEmbeddingProvider::new(EmbeddingServiceConfig::from_env()?)?;
        let inference = InferenceServiceConfig::from_env()?;
        let answer = ChatCompletionsClient::new(inference.clone(), inference.answer_model.clone())?;
        let summary = ChatCompletionsClient::new(inference.clone(), inference.summary_model)?;

        Self::builder()
            .config(config)
            .embedding_provider(Arc::new(embedding))
            .answer_inference(Arc::new(answer))
            .summary_inference(Arc::new(summary))
            .build()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Open a session that owns `document` and memoizes its index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if the document is too large.
    pub fn open(self: &Arc<Self>, document: Document) -> Result<DocumentSession> {
        self.validate_document(&document)?;
        Ok(DocumentSession::new(Arc::clone(self), document))
    }

    /// Reject documents above the configured size ceiling.
    pub fn validate_document(&self, document: &Document) -> Result<()> {
        let chars = document.char_len();
        if chars > self.config.max_document_chars {
            return Err(RagError::Validation(format!(
                "document has {chars} characters, the limit is {}",
                self.config.max_document_chars
            )));
        }
        Ok(())
    }

    /// Reject blank or oversized questions.
    pub fn validate_question(&self, question: &str) -> Result<()> {
        if question.trim().is_empty() {
            return Err(RagError::Validation("question must not be empty".to_string()));
        }
        let chars = question.chars().count();
        if chars > self.config.max_question_chars {
            return Err(RagError::Validation(format!(
                "question has {chars} characters, the limit is {}",
                self.config.max_question_chars
            )));
        }
        Ok(())
    }

    /// Build the vector index for a document: chunk → embed → index.
    ///
    /// An empty document yields an empty index. The build is atomic: on any
    /// failure nothing is returned, so no partial index can be queried.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for oversized documents,
    /// [`RagError::EmbeddingService`] if embedding fails, and
    /// [`RagError::DimensionMismatch`] if the embeddings are inconsistent.
    pub async fn build_index(&self, document: &Document) -> Result<VectorIndex> {
        self.validate_document(document)?;
        let started = Instant::now();

        let segments = self.chunker.split(document.text());
        if segments.is_empty() {
            info!(segment_count = 0, "built index (empty document)");
            return VectorIndex::build(Vec::new(), Vec::new());
        }

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let plan = BatchPlan {
            batch_size: self.config.embedding_batch_size,
            concurrency: self.config.embedding_concurrency,
            timeout: self.config.timeout,
        };
        let embeddings = embed_all(self.embedding_provider.as_ref(), &texts, plan)
            .await
            .inspect_err(|e| error!(error = %e, "embedding failed during index build"))?;

        let index = VectorIndex::build(embeddings, segments)
            .inspect_err(|e| error!(error = %e, "index build rejected embeddings"))?;

        info!(
            segment_count = index.len(),
            dimensions = index.dimensions(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built index"
        );
        Ok(index)
    }

    /// An owned build future, for sharing between concurrent waiters.
    pub(crate) fn build_shared(
        self: Arc<Self>,
        document: Document,
    ) -> BoxFuture<'static, Result<Arc<VectorIndex>>> {
        async move { self.build_index(&document).await.map(Arc::new) }.boxed()
    }

    /// Answer `question` from `index`, retrieving `top_k` segments (or the
    /// configured default).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] before any external call if the
    /// question is blank or too long; otherwise propagates retrieval and
    /// synthesis errors unchanged.
    pub async fn ask(
        &self,
        index: &VectorIndex,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<Answer> {
        self.validate_question(question)?;
        let k = top_k.unwrap_or(self.config.top_k);

        let results = self.retriever.retrieve(index, question, k).await?;
        let answer = self.synthesizer.synthesize(question, results).await?;

        info!(
            k,
            sources = answer.sources.len(),
            dropped = answer.dropped,
            "answered question"
        );
        Ok(answer)
    }

    /// Summarize a document, independently of any index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for empty documents and
    /// [`RagError::InferenceService`] on backend failure.
    pub async fn summarize(&self, document: &Document) -> Result<String> {
        self.validate_document(document)?;
        let summary = self.summarizer.summarize(document.text()).await?;
        info!(summary_chars = summary.len(), "summarized document");
        Ok(summary)
    }

    /// Word count, reading time, and sentiment for a document.
    pub fn analyze(&self, document: &Document) -> DocumentAnalysis {
        DocumentAnalysis::of(document.text(), self.sentiment.as_ref())
    }
}

/// Builder for constructing a [`QaPipeline`].
///
/// `embedding_provider` and `answer_inference` are required. The summary
/// service defaults to the answer service, the chunker to a
/// [`SeparatorChunker`] built from the config, and the sentiment scorer to
/// [`LexiconSentimentScorer`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = QaPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .answer_inference(Arc::new(answer_llm))
///     .summary_inference(Arc::new(summary_llm))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct QaPipelineBuilder {
    config: Option<RagConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    answer_inference: Option<Arc<dyn InferenceService>>,
    summary_inference: Option<Arc<dyn InferenceService>>,
    sentiment: Option<Arc<dyn SentimentScorer>>,
}

impl QaPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the default chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the inference service used for answers.
    pub fn answer_inference(mut self, service: Arc<dyn InferenceService>) -> Self {
        self.answer_inference = Some(service);
        self
    }

    /// Set the inference service used for summaries.
    pub fn summary_inference(mut self, service: Arc<dyn InferenceService>) -> Self {
        self.summary_inference = Some(service);
        self
    }

    /// Replace the default sentiment scorer.
    pub fn sentiment_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.sentiment = Some(scorer);
        self
    }

    /// Build the [`QaPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required service is missing.
    pub fn build(self) -> Result<QaPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let answer_inference = self
            .answer_inference
            .ok_or_else(|| RagError::Config("answer_inference is required".to_string()))?;
        let summary_inference =
            self.summary_inference.unwrap_or_else(|| Arc::clone(&answer_inference));
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(SeparatorChunker::new(
                config.separator.clone(),
                config.chunk_size,
                config.chunk_overlap,
            ))
        });

        Ok(QaPipeline {
            retriever: Retriever::new(Arc::clone(&embedding_provider), config.timeout),
            synthesizer: AnswerSynthesizer::new(
                answer_inference,
                config.max_context_chars,
                config.max_tokens,
                config.timeout,
            ),
            summarizer: Summarizer::new(
                summary_inference,
                config.summary_chars,
                config.max_tokens,
                config.timeout,
            ),
            sentiment: self.sentiment.unwrap_or_else(|| Arc::new(LexiconSentimentScorer)),
            chunker,
            embedding_provider,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SentimentLabel;
    use crate::error::{ErrorKind, Stage};
    use crate::testing::{BagOfWordsEmbedder, FailingEmbedder, GroundedInference, RecordingInference};

    fn pipeline_with(embedder: Arc<dyn EmbeddingProvider>) -> QaPipeline {
        QaPipeline::builder()
            .config(RagConfig::builder().chunk_size(40).chunk_overlap(0).build().unwrap())
            .embedding_provider(embedder)
            .answer_inference(Arc::new(GroundedInference::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn missing_services_are_config_errors() {
        let err = QaPipeline::builder().build().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = QaPipeline::builder()
            .embedding_provider(Arc::new(BagOfWordsEmbedder::new(8)))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("answer_inference"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_embedding() {
        let embedder = Arc::new(BagOfWordsEmbedder::new(64));
        let pipeline = pipeline_with(embedder.clone());
        let index = pipeline.build_index(&Document::new("some text")).await.unwrap();
        let calls = embedder.calls();
        let err = pipeline.ask(&index, "   ", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(embedder.calls(), calls);
    }

    #[tokio::test]
    async fn oversized_document_is_rejected() {
        let pipeline = QaPipeline::builder()
            .config(RagConfig::builder().max_document_chars(5).build().unwrap())
            .embedding_provider(Arc::new(BagOfWordsEmbedder::new(8)))
            .answer_inference(Arc::new(GroundedInference::new()))
            .build()
            .unwrap();
        let err = pipeline.build_index(&Document::new("too long")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn embedding_failure_fails_the_whole_build() {
        let pipeline = pipeline_with(Arc::new(FailingEmbedder::unreachable()));
        let err = pipeline.build_index(&Document::new("a\nb")).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Embed));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn summary_uses_its_own_service() {
        let summary = Arc::new(RecordingInference::replying("short summary"));
        let pipeline = QaPipeline::builder()
            .embedding_provider(Arc::new(BagOfWordsEmbedder::new(8)))
            .answer_inference(Arc::new(GroundedInference::new()))
            .summary_inference(summary.clone())
            .build()
            .unwrap();
        let text = pipeline.summarize(&Document::new("A long document.")).await.unwrap();
        assert_eq!(text, "short summary");
        assert_eq!(summary.prompts().len(), 1);
    }

    #[test]
    fn analysis_reports_stats_and_sentiment() {
        let pipeline = pipeline_with(Arc::new(BagOfWordsEmbedder::new(8)));
        let analysis = pipeline.analyze(&Document::new("A wonderful and excellent result."));
        assert_eq!(analysis.stats.word_count, 5);
        assert_eq!(analysis.sentiment.label, SentimentLabel::Positive);
    }
}

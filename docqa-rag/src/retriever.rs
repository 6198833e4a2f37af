//! Question retrieval: embed the question, then search the index.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::index::VectorIndex;

/// Embeds questions and returns the top-k matching segments.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever using `embedder` for question embeddings.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self { embedder, timeout }
    }

    /// Retrieve the `k` segments most similar to `question`.
    ///
    /// An empty index short-circuits without calling the embedding service.
    ///
    /// # Errors
    ///
    /// Embedding failures surface as [`RagError::EmbeddingService`] and
    /// dimension disagreements as [`RagError::DimensionMismatch`], both
    /// tagged with [`Stage::Retrieve`].
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        question: &str,
        k: usize,
    ) -> Result<RetrievalResult> {
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = tokio::time::timeout(self.timeout, self.embedder.embed(question))
            .await
            .map_err(|_| {
                RagError::embedding(
                    self.embedder.name(),
                    format!("request timed out after {:?}", self.timeout),
                )
            })
            .and_then(|result| result)
            .map_err(|e| e.at_stage(Stage::Retrieve))?;

        let results = index.query(&embedding, k).map_err(|e| e.at_stage(Stage::Retrieve))?;
        debug!(
            k,
            result_count = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved segments"
        );
        Ok(results)
    }
}

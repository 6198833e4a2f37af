//! Embedding provider trait and batched, order-preserving embedding.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::{RagError, Result, Stage};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. Providers are stateless with respect to the pipeline: the same
/// input always maps to the same vector, so batches may be issued
/// concurrently.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let vectors = provider.embed_batch(&["hello", "world"]).await?;
/// assert_eq!(vectors.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate one embedding per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text as a one-element batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        if vectors.len() != 1 {
            return Err(RagError::embedding(
                self.name(),
                format!("expected 1 embedding, received {}", vectors.len()),
            ));
        }
        Ok(vectors.remove(0))
    }
}

/// How [`embed_all`] splits work across backend calls.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlan {
    /// Maximum texts per backend call.
    pub batch_size: usize,
    /// Maximum backend calls in flight at once.
    pub concurrency: usize,
    /// Deadline for each backend call.
    pub timeout: Duration,
}

/// Embed every text, issuing batches concurrently and reassembling the
/// results in input order.
///
/// Each batch is checked for a length mismatch, so a misbehaving backend can
/// never shift embeddings onto the wrong segment. A timed-out batch fails the
/// whole call with [`RagError::EmbeddingService`].
pub async fn embed_all(
    provider: &dyn EmbeddingProvider,
    texts: &[&str],
    plan: BatchPlan,
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = plan.batch_size.max(1);
    let batch_count = texts.len().div_ceil(batch_size);
    debug!(
        provider = provider.name(),
        texts = texts.len(),
        batch_count,
        concurrency = plan.concurrency,
        "embedding segments"
    );

    let batches: Vec<Vec<Vec<f32>>> = stream::iter(0..batch_count)
        .map(move |i| {
            let end = ((i + 1) * batch_size).min(texts.len());
            embed_checked(provider, &texts[i * batch_size..end], plan.timeout)
        })
        .buffered(plan.concurrency.max(1))
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}

async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    batch: &[&str],
    timeout: Duration,
) -> Result<Vec<Vec<f32>>> {
    let vectors = tokio::time::timeout(timeout, provider.embed_batch(batch))
        .await
        .map_err(|_| {
            RagError::embedding(provider.name(), format!("request timed out after {timeout:?}"))
        })??;

    if vectors.len() != batch.len() {
        return Err(RagError::EmbeddingService {
            stage: Stage::Embed,
            provider: provider.name().to_string(),
            message: format!(
                "malformed response: {} embeddings for {} inputs",
                vectors.len(),
                batch.len()
            ),
        });
    }
    Ok(vectors)
}

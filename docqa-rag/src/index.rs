//! In-memory vector index using exact cosine similarity.
//!
//! A [`VectorIndex`] is built once per document and is immutable afterwards,
//! so it can be shared behind an `Arc` and queried concurrently without
//! locking. Queries are a brute-force linear scan over every entry.

use tracing::debug;

use crate::document::{RetrievalResult, ScoredSegment, Segment};
use crate::error::{RagError, Result, Stage};

/// A stored (embedding, segment) pair.
#[derive(Debug, Clone, PartialEq)]
struct IndexEntry {
    embedding: Vec<f32>,
    norm: f64,
    segment: Segment,
}

/// The searchable (embedding, segment) pairs for one document.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Segment, VectorIndex};
///
/// let segments = vec![
///     Segment { index: 0, offset: 0, text: "cats".into() },
///     Segment { index: 1, offset: 4, text: "dogs".into() },
/// ];
/// let index = VectorIndex::build(vec![vec![1.0, 0.0], vec![0.0, 1.0]], segments)?;
/// let results = index.query(&[1.0, 0.0], 5)?;
/// assert_eq!(results.len(), 2);
/// assert_eq!(results[0].segment.text, "cats");
/// # Ok::<(), docqa_rag::RagError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

impl VectorIndex {
    /// Build an index from parallel embedding and segment lists.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the lists differ in length
    /// or the embeddings do not all share one dimensionality.
    pub fn build(embeddings: Vec<Vec<f32>>, segments: Vec<Segment>) -> Result<Self> {
        if embeddings.len() != segments.len() {
            return Err(RagError::DimensionMismatch {
                stage: Stage::Index,
                expected: segments.len(),
                found: embeddings.len(),
            });
        }

        let dimensions = embeddings.first().map_or(0, Vec::len);
        let mut entries = Vec::with_capacity(segments.len());
        for (embedding, segment) in embeddings.into_iter().zip(segments) {
            if embedding.len() != dimensions {
                return Err(RagError::DimensionMismatch {
                    stage: Stage::Index,
                    expected: dimensions,
                    found: embedding.len(),
                });
            }
            let norm = l2_norm(&embedding);
            entries.push(IndexEntry { embedding, norm, segment });
        }

        debug!(entries = entries.len(), dimensions, "built vector index");
        Ok(Self { entries, dimensions })
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality shared by every stored embedding (0 when empty).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// `k` is clamped to the index size. Equal scores keep insertion order,
    /// so results are reproducible. An empty index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the query dimensionality
    /// differs from the stored embeddings.
    pub fn query(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                stage: Stage::Index,
                expected: self.dimensions,
                found: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                (position, cosine_similarity(&entry.embedding, entry.norm, query, query_norm))
            })
            .collect();

        // `sort_by` is stable: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredSegment {
                segment: self.entries[position].segment.clone(),
                score,
            })
            .collect())
    }
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

/// Compute cosine similarity with precomputed norms.
///
/// Accumulates in `f64` so an exact self-match scores 1.0 after rounding.
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(n: usize) -> Vec<Segment> {
        (0..n).map(|i| Segment { index: i, offset: i * 10, text: format!("segment {i}") }).collect()
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = VectorIndex::build(vec![vec![1.0]], segments(2)).unwrap_err();
        assert_eq!(err, RagError::DimensionMismatch { stage: Stage::Index, expected: 2, found: 1 });
    }

    #[test]
    fn ragged_embeddings_are_rejected() {
        let err = VectorIndex::build(vec![vec![1.0, 0.0], vec![1.0]], segments(2)).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn query_dimension_must_match() {
        let index = VectorIndex::build(vec![vec![1.0, 0.0]], segments(1)).unwrap();
        assert!(index.query(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index =
            VectorIndex::build(vec![vec![0.0, 1.0], vec![0.0, 2.0], vec![0.0, 3.0]], segments(3))
                .unwrap();
        let results = index.query(&[0.0, 1.0], 3).unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.segment.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn zero_vectors_score_zero() {
        let index = VectorIndex::build(vec![vec![0.0, 0.0]], segments(1)).unwrap();
        assert_eq!(index.query(&[1.0, 0.0], 1).unwrap()[0].score, 0.0);
    }

    #[test]
    fn empty_index_answers_any_query_with_nothing() {
        let index = VectorIndex::build(Vec::new(), Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&[0.3, 0.1, 0.9], 4).unwrap().is_empty());
    }

    #[test]
    fn k_zero_returns_nothing() {
        let index = VectorIndex::build(vec![vec![1.0]], segments(1)).unwrap();
        assert!(index.query(&[1.0], 0).unwrap().is_empty());
    }
}

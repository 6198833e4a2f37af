//! Deterministic in-process services for tests, demos, and offline runs.
//!
//! None of these call the network. [`BagOfWordsEmbedder`] produces
//! content-dependent vectors so similarity ranking behaves sensibly, and
//! [`GroundedInference`] answers by quoting the best-ranked context passage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inference::{Completion, CompletionRequest, InferenceService};

/// Hashes lowercase words into a fixed number of buckets and L2-normalizes.
///
/// Texts that share words get a positive cosine similarity; identical texts
/// get identical vectors.
#[derive(Debug, Default)]
pub struct BagOfWordsEmbedder {
    dimensions: usize,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl BagOfWordsEmbedder {
    /// Create an embedder producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, delay: None, calls: AtomicUsize::new(0) }
    }

    /// Sleep for `delay` inside every batch call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of batch calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Embed synchronously, without counting a call.
    pub fn vectors(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.vector(text)).collect()
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions.max(1)];
        let len = v.len() as u64;
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = fnv1a(&word.to_lowercase()) % len;
            v[bucket as usize] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    fn name(&self) -> &str {
        "BagOfWords"
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.vectors(texts))
    }
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Unreachable,
    ShortBatches,
    Hanging,
}

/// An embedder that misbehaves in a chosen way.
#[derive(Debug)]
pub struct FailingEmbedder {
    failure: Failure,
}

impl FailingEmbedder {
    /// Every call fails as if the service were down.
    pub fn unreachable() -> Self {
        Self { failure: Failure::Unreachable }
    }

    /// Every call returns one embedding fewer than requested.
    pub fn short_batches() -> Self {
        Self { failure: Failure::ShortBatches }
    }

    /// Every call never completes.
    pub fn hanging() -> Self {
        Self { failure: Failure::Hanging }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match self.failure {
            Failure::Unreachable => Err(RagError::embedding(self.name(), "connection refused")),
            Failure::ShortBatches => Ok(vec![vec![1.0]; texts.len().saturating_sub(1)]),
            Failure::Hanging => std::future::pending().await,
        }
    }
}

/// Answers by quoting the first context passage of the prompt.
#[derive(Debug, Default)]
pub struct GroundedInference {
    calls: AtomicUsize,
}

impl GroundedInference {
    /// Create a new grounded mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completions served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceService for GroundedInference {
    fn name(&self) -> &str {
        "Grounded"
    }

    fn model(&self) -> &str {
        "grounded-mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = request.prompt.split_once("\n\n").map_or("", |(_, rest)| rest);
        let context = body.split("\n\nQuestion:").next().unwrap_or_default();
        let first = context.split("\n\n").next().unwrap_or_default().trim();
        Ok(Completion::Message {
            role: "assistant".to_string(),
            content: format!("According to the document: {first}"),
        })
    }
}

/// Records every prompt and replies with fixed text.
#[derive(Debug, Default)]
pub struct RecordingInference {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingInference {
    /// Reply with `reply` to every request.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), prompts: Mutex::new(Vec::new()) }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl InferenceService for RecordingInference {
    fn name(&self) -> &str {
        "Recording"
    }

    fn model(&self) -> &str {
        "recording-mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(request.prompt);
        Ok(Completion::Text { text: self.reply.clone() })
    }
}

/// Fails every request as if the backend were rate limiting.
#[derive(Debug, Default)]
pub struct FailingInference;

impl FailingInference {
    /// Create a new failing mock.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InferenceService for FailingInference {
    fn name(&self) -> &str {
        "Failing"
    }

    fn model(&self) -> &str {
        "failing-mock"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<Completion> {
        Err(RagError::inference(self.name(), "API returned 429 Too Many Requests"))
    }
}

//! Data types for documents, segments, retrieval results, and answers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A source document: raw text plus an optional display name.
///
/// The text is shared behind an `Arc` and never mutated after extraction, so
/// cloning a document is cheap and an index build can own its input.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Display name, usually the uploaded file name.
    pub name: Option<String>,
    text: Arc<str>,
}

impl Document {
    /// Create a document from extracted text.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { name: None, text: text.into() }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A contiguous substring of a [`Document`].
///
/// `offset` is the byte offset of the first character in the document text.
/// Segments produced by the chunker may overlap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    /// Position of the segment in chunker output order.
    pub index: usize,
    /// Byte offset of the segment start within the document.
    pub offset: usize,
    /// The segment text.
    pub text: String,
}

impl Segment {
    /// Byte offset one past the last byte of the segment.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// A retrieved [`Segment`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredSegment {
    /// The retrieved segment.
    pub segment: Segment,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Segments ranked by descending similarity, at most `k` long.
pub type RetrievalResult = Vec<ScoredSegment>;

/// A synthesized answer and the segments it was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// Segments included in the prompt, in ranked order.
    pub sources: Vec<ScoredSegment>,
    /// Number of retrieved segments left out to fit the inference input limit.
    pub dropped: usize,
}

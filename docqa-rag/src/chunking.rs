//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SeparatorChunker`], a
//! separator-aware sliding window. Text is cut into atomic units at every
//! occurrence of the separator (the separator stays attached to the unit it
//! terminates), and units are packed greedily into segments of at most
//! `chunk_size` characters. Each new segment starts with the trailing units
//! of the previous one, up to `chunk_overlap` characters.
//!
//! Because separators are kept, the segments are contiguous slices of the
//! input and stitching their non-overlapping parts together yields the
//! original text exactly.

use std::collections::VecDeque;

use crate::document::Segment;

/// A strategy for splitting document text into segments.
pub trait Chunker: Send + Sync {
    /// Split text into ordered segments.
    ///
    /// Returns an empty `Vec` for empty text.
    fn split(&self, text: &str) -> Vec<Segment>;
}

/// Splits text on a separator and packs the pieces into overlapping windows.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunker, SeparatorChunker};
///
/// let chunker = SeparatorChunker::new("\n", 40, 0);
/// let segments = chunker.split("Paris is the capital of France.\nBerlin is the capital of Germany.");
/// assert_eq!(segments.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SeparatorChunker {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SeparatorChunker {
    /// Create a new `SeparatorChunker`.
    ///
    /// # Arguments
    ///
    /// * `separator`: boundary string; an empty separator splits per character
    /// * `chunk_size`: maximum number of characters per segment
    /// * `chunk_overlap`: maximum number of characters shared by adjacent segments
    pub fn new(separator: impl Into<String>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { separator: separator.into(), chunk_size, chunk_overlap }
    }
}

impl Chunker for SeparatorChunker {
    fn split(&self, text: &str) -> Vec<Segment> {
        split(text, &self.separator, self.chunk_size, self.chunk_overlap)
    }
}

/// An atomic piece of text that is never cut further.
#[derive(Debug, Clone, Copy)]
struct Unit {
    offset: usize,
    len: usize,
    chars: usize,
}

/// Split `text` into overlapping segments.
///
/// Units are accumulated until adding the next one would push the window past
/// `chunk_size` characters. A unit that is longer than `chunk_size` on its own
/// becomes a single oversized segment instead of being truncated.
pub fn split(text: &str, separator: &str, chunk_size: usize, overlap: usize) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut window: VecDeque<Unit> = VecDeque::new();
    let mut window_chars = 0;

    for unit in units(text, separator) {
        if !window.is_empty() && window_chars + unit.chars > chunk_size {
            segments.push(segment_from(text, &window, segments.len()));

            // Keep a strict suffix of the emitted window as overlap, and only
            // as much of it as still leaves room for the incoming unit.
            while let Some(front) = window.front() {
                if window_chars <= overlap && window_chars + unit.chars <= chunk_size {
                    break;
                }
                window_chars -= front.chars;
                window.pop_front();
            }
        }
        window_chars += unit.chars;
        window.push_back(unit);
    }

    if !window.is_empty() {
        segments.push(segment_from(text, &window, segments.len()));
    }

    segments
}

/// Cut text at every separator, keeping the separator on the preceding unit.
fn units(text: &str, separator: &str) -> Vec<Unit> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(offset, c)| Unit { offset, len: c.len_utf8(), chars: 1 })
            .collect();
    }

    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(unit_at(text, start, end));
        start = end;
    }

    if start < text.len() {
        result.push(unit_at(text, start, text.len()));
    }

    result
}

fn unit_at(text: &str, start: usize, end: usize) -> Unit {
    Unit { offset: start, len: end - start, chars: text[start..end].chars().count() }
}

fn segment_from(text: &str, window: &VecDeque<Unit>, index: usize) -> Segment {
    let (first, last) = match (window.front(), window.back()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Segment { index, offset: 0, text: String::new() },
    };
    let start = first.offset;
    let end = last.offset + last.len;
    Segment { index, offset: start, text: text[start..end].to_string() }
}

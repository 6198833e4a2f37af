//! Text extraction from uploaded artifacts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RagError, Result};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// UTF-8 plain text.
    PlainText,
    /// Portable Document Format.
    Pdf,
}

impl FileKind {
    /// Resolve a MIME type such as `text/plain; charset=utf-8`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Extraction`] for any other type.
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match essence.as_str() {
            "text/plain" => Ok(Self::PlainText),
            "application/pdf" => Ok(Self::Pdf),
            other => Err(RagError::extraction(format!("unsupported file format: {other}"))),
        }
    }

    /// Resolve a file extension (`.txt`, `.pdf`).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Extraction`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "txt" | "text" => Ok(Self::PlainText),
            "pdf" => Ok(Self::Pdf),
            _ => Err(RagError::extraction(format!(
                "unsupported file format: {}",
                path.display()
            ))),
        }
    }
}

/// Extract raw text from uploaded bytes.
///
/// # Errors
///
/// Returns [`RagError::Extraction`] if the bytes are not valid for `kind`,
/// or if PDF support was compiled out.
pub fn extract_text(bytes: &[u8], kind: FileKind) -> Result<String> {
    let text = match kind {
        FileKind::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|e| RagError::extraction(format!("text file is not valid UTF-8: {e}")))?,
        FileKind::Pdf => extract_pdf(bytes)?,
    };
    debug!(?kind, bytes = bytes.len(), chars = text.chars().count(), "extracted document text");
    Ok(text)
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // pdf-extract can panic on malformed input instead of returning an error.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| RagError::extraction("failed to read PDF: document is corrupt"))?
        .map_err(|e| RagError::extraction(format!("failed to read PDF: {e}")))
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<String> {
    Err(RagError::extraction("PDF support is not enabled in this build"))
}

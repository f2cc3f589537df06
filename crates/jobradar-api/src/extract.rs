//! Résumé text extraction seam.
//!
//! PDF parsing is an external collaborator: the analyzer consumes plain
//! text and this trait is where a real PDF extractor plugs in. The
//! default implementation handles plain-text uploads, honoring the
//! first-N-pages cap for form-feed-paginated documents.

use jobradar_core::{Error, Result};

/// Extracts plain text from an uploaded résumé payload.
pub trait ResumeExtractor: Send + Sync {
    /// Whether this extractor handles the given filename.
    fn supports(&self, filename: &str) -> bool;

    /// Extract text from the payload, restricted to the first
    /// `max_pages` pages.
    fn extract_text(&self, bytes: &[u8], max_pages: usize) -> Result<String>;
}

/// Plain-text extractor for `.txt` uploads. Pages are form-feed
/// separated; most plain-text résumés are a single page.
pub struct PlainTextExtractor;

impl ResumeExtractor for PlainTextExtractor {
    fn supports(&self, filename: &str) -> bool {
        filename.to_lowercase().ends_with(".txt")
    }

    fn extract_text(&self, bytes: &[u8], max_pages: usize) -> Result<String> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::InvalidInput("Resume is not valid UTF-8 text".to_string()))?;

        let pages: Vec<&str> = text.split('\u{0c}').take(max_pages.max(1)).collect();
        Ok(pages.join("\n").trim().to_string())
    }
}

//! Document domain type
//!
//! The uploaded project specification. Validated on construction and
//! superseded, never merged, by the next upload.

use contextstore::{Chunk, ChunkError, chunk};
use tracing::debug;

use crate::error::PlanError;

/// Minimum accepted document length, in characters
pub const MIN_DOCUMENT_CHARS: usize = 100;

/// Maximum accepted document length, in characters
pub const MAX_DOCUMENT_CHARS: usize = 100_000;

/// A validated project specification
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    text: String,
}

impl Document {
    /// Validate `text` and wrap it as a document named `source`
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Result<Self, PlanError> {
        let source = source.into();
        let text = text.into();
        debug!(%source, len = text.len(), "Document::new: called");
        validate_text(&text).map_err(|e| match e {
            PlanError::Validation(msg) => PlanError::Validation(format!("{source}: {msg}")),
            other => other,
        })?;
        Ok(Self { source, text })
    }

    /// Join several documents into one, separated by blank lines
    ///
    /// The joined text is validated again, so the combined size must also
    /// stay within bounds.
    pub fn join(mut docs: Vec<Document>) -> Result<Self, PlanError> {
        debug!(count = %docs.len(), "Document::join: called");
        match docs.len() {
            0 => Err(PlanError::Validation("No input documents given".to_string())),
            1 => Ok(docs.remove(0)),
            _ => {
                let source = docs.iter().map(|d| d.source.as_str()).collect::<Vec<_>>().join("+");
                let text = docs.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join("\n\n");
                Document::new(source, text)
            }
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Split into overlapping chunks
    pub fn chunks(&self, size: usize, overlap: usize) -> Result<Vec<Chunk>, PlanError> {
        chunk(&self.text, size, overlap).map_err(|e| match e {
            ChunkError::InvalidConfiguration { .. } => PlanError::InvalidConfiguration(e.to_string()),
        })
    }
}

/// Check the size bounds and reject blank text
pub fn validate_text(text: &str) -> Result<(), PlanError> {
    if text.trim().is_empty() {
        return Err(PlanError::Validation(
            "Text is empty or contains only whitespace".to_string(),
        ));
    }

    let len = text.chars().count();
    if len < MIN_DOCUMENT_CHARS {
        return Err(PlanError::Validation(format!(
            "Text is too short ({len} characters, minimum {MIN_DOCUMENT_CHARS}). Please provide more detail."
        )));
    }
    if len > MAX_DOCUMENT_CHARS {
        return Err(PlanError::Validation(format!(
            "Text is too long ({len} characters, maximum {MAX_DOCUMENT_CHARS}). Please split into smaller documents."
        )));
    }
    Ok(())
}

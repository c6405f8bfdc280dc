//! Fixed-size overlapping chunker

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A window of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the chunk sequence (0-based)
    pub index: usize,
    /// Character offset of the first character in the source text
    pub offset: usize,
    /// Chunk content
    pub text: String,
}

impl Chunk {
    /// Number of characters in this chunk
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Chunking parameter errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("Invalid chunk configuration: size ({size}) must be greater than overlap ({overlap})")]
    InvalidConfiguration { size: usize, overlap: usize },
}

/// Split `text` into windows of `size` characters advancing by `size - overlap`
///
/// Every chunk except possibly the last is exactly `size` characters long and
/// shares its first `overlap` characters with the end of its predecessor.
/// Sizes are counted in characters, so multi-byte text is never split inside
/// a code point.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkError> {
    debug!(text_len = text.len(), size, overlap, "chunk: called");
    if size <= overlap {
        debug!("chunk: size must exceed overlap");
        return Err(ChunkError::InvalidConfiguration { size, overlap });
    }

    // Byte position of every char boundary, including the end of the text
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;
    let stride = size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total {
        let end = (start + size).min(total);
        chunks.push(Chunk {
            index: chunks.len(),
            offset: start,
            text: text[bounds[start]..bounds[end]].to_string(),
        });
        if end == total {
            break;
        }
        start += stride;
    }

    debug!(chunk_count = chunks.len(), "chunk: done");
    Ok(chunks)
}

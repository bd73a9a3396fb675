//! Fixed-window text chunker.
//!
//! Windows are measured in characters (Unicode scalar values), so a chunk
//! boundary never splits a multi-byte code point.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// A window of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Character offset in the source text.
    pub start_offset: usize,
    /// Zero-based position within the source.
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.size - self.overlap
    }

    /// Splits `text` into windows starting every `size - overlap` characters.
    /// The last window may be shorter than `size`.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        // Byte offset of every char boundary, plus the end of the string.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;

        let mut chunks = Vec::with_capacity(total_chars / self.stride() + 1);
        let mut start = 0;
        while start < total_chars {
            let end = (start + self.size).min(total_chars);
            chunks.push(TextChunk {
                text: text[boundaries[start]..boundaries[end]].to_string(),
                start_offset: start,
                chunk_index: chunks.len(),
            });
            start += self.stride();
        }

        chunks
    }
}

/// Convenience wrapper returning only the segment texts.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    let chunker = Chunker::new(size, overlap)?;
    Ok(chunker.split(text).into_iter().map(|c| c.text).collect())
}

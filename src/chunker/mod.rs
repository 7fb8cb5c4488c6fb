// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Splits page text into overlapping fixed-size fragments for embedding.
//!
//! Windows are measured in Unicode scalar values, never raw bytes, so
//! multi-byte text cannot be cut mid-character. The function is pure:
//! identical input and parameters always produce an identical fragment
//! sequence.

use uuid::Uuid;

use crate::config::ConfigError;

/// Sliding-window parameters for fragment extraction.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Fragment window width in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive fragments.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkConfig {
    /// Enforce `0 < overlap < chunk_size`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.overlap == 0 || self.overlap >= self.chunk_size {
            return Err(ConfigError::InvalidOverlap {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }
}

/// A contiguous span of document text, the unit of retrieval.
///
/// `index` is the fragment's position within the concatenated document and
/// drives tie-breaking during search. Fragments are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub content: String,
    pub index: usize,
    pub document_id: Uuid,
}

/// Split page texts into overlapping fragments.
///
/// Pages are concatenated with `\n` and a window of `chunk_size` characters
/// advances by `chunk_size - overlap` each step; the remaining tail becomes
/// the final fragment unpadded. All fragments except possibly the last have
/// exactly `chunk_size` characters.
pub fn split(
    document_id: Uuid,
    pages: &[String],
    config: &ChunkConfig,
) -> Result<Vec<Fragment>, ConfigError> {
    config.validate()?;

    let text = pages.join("\n");
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = config.chunk_size - config.overlap;
    let mut fragments = Vec::new();
    let mut start = 0usize;
    loop {
        let end = usize::min(start + config.chunk_size, chars.len());
        fragments.push(Fragment {
            content: chars[start..end].iter().collect(),
            index: fragments.len(),
            document_id,
        });
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(fragments)
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Decodes a binary document into an ordered sequence of page-level text blocks.

mod pdf;

use thiserror::Error;

/// Errors surfaced while decoding a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The byte buffer is not a well-formed document of the supported format.
    #[error("failed to decode document: {0}")]
    Decode(String),

    /// Decoding succeeded but no page yields extractable text.
    #[error("document contains no extractable text")]
    Empty,
}

/// PDF decoder producing one text block per page, in page order.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Decode a PDF byte buffer into per-page text.
    ///
    /// Decoding is CPU-bound and runs on the blocking pool. Extraction
    /// failures on individual pages are logged and tolerated as long as at
    /// least one page produces text; an entirely text-free document is
    /// `DocumentError::Empty`.
    pub async fn load(bytes: Vec<u8>) -> Result<Vec<String>, DocumentError> {
        tokio::task::spawn_blocking(move || pdf::extract_pages(&bytes))
            .await
            .map_err(|e| DocumentError::Decode(format!("decode task failed: {e}")))?
    }
}

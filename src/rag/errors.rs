// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Ingestion error taxonomy.
//!
//! Stage errors propagate through `Retriever::ingest` unchanged; ingestion is
//! all-or-nothing, so a failed ingest never exposes a partially built store.

use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::embeddings::EmbeddingError;

/// Failure of the load -> chunk -> embed -> store pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Another ingestion already holds the single slot for this retriever.
    #[error("another document ingestion is already in progress")]
    Busy,
}

impl IngestError {
    /// Whether the same ingestion could succeed if simply tried again.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Busy => true,
            IngestError::Embedding(e) => e.is_retryable(),
            IngestError::Document(_) | IngestError::Config(_) => false,
        }
    }
}

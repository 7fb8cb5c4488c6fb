// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Ingest and retrieval facade over loader, chunker, embedder and store.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunker::{self, ChunkConfig};
use crate::config::ConfigError;
use crate::document::DocumentLoader;
use crate::embeddings::{EmbeddingBackend, EmbeddingError};

use super::errors::IngestError;
use super::memory_store::{MemoryVectorStore, VectorStore, VectorStoreEntry};

/// Separator between retrieved fragment texts in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Shared handle to one fully ingested document's vector store.
///
/// Clones share the same immutable store snapshot; dropping the last handle
/// releases the store memory immediately.
#[derive(Clone)]
pub struct StoreHandle {
    document_id: Uuid,
    file_name: String,
    store: Arc<dyn VectorStore>,
}

impl StoreHandle {
    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn fragment_count(&self) -> usize {
        self.store.len()
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }
}

/// Context assembled for one query.
#[derive(Debug)]
pub struct RetrievedContext {
    /// Retrieved fragment texts joined with `CONTEXT_SEPARATOR`, best first.
    pub context: String,
    /// Number of fragments behind `context`.
    pub fragment_count: usize,
    /// Set when query-time embedding failed and retrieval degraded to an
    /// empty context instead of blocking the conversation turn.
    pub degraded: Option<EmbeddingError>,
}

impl RetrievedContext {
    fn empty() -> Self {
        Self {
            context: String::new(),
            fragment_count: 0,
            degraded: None,
        }
    }

    fn degraded(error: EmbeddingError) -> Self {
        Self {
            context: String::new(),
            fragment_count: 0,
            degraded: Some(error),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Orchestrates ingestion (load -> chunk -> embed -> store) and retrieval
/// (embed query -> search -> join).
pub struct Retriever {
    embedder: Arc<dyn EmbeddingBackend>,
    chunk: ChunkConfig,
    // Single-slot gate: at most one ingestion in flight per retriever.
    ingest_gate: Mutex<()>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        chunk: ChunkConfig,
    ) -> Result<Self, ConfigError> {
        chunk.validate()?;
        Ok(Self {
            embedder,
            chunk,
            ingest_gate: Mutex::new(()),
        })
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Ingest one document into a freshly built vector store.
    ///
    /// Any stage failure aborts the whole ingestion and surfaces the
    /// originating error kind unchanged; no partially built store escapes.
    /// A second ingestion while one is in flight is rejected with
    /// `IngestError::Busy`.
    pub async fn ingest(&self, bytes: Vec<u8>, file_name: &str) -> Result<StoreHandle, IngestError> {
        let _gate = self.ingest_gate.try_lock().map_err(|_| IngestError::Busy)?;

        let document_id = Uuid::new_v4();
        info!(
            "ingesting '{}' ({} bytes) as document {}",
            file_name,
            bytes.len(),
            document_id
        );

        let pages = DocumentLoader::load(bytes).await?;
        let fragments = chunker::split(document_id, &pages, &self.chunk)?;
        debug!(
            "document {} split into {} fragments",
            document_id,
            fragments.len()
        );

        let texts: Vec<String> = fragments.iter().map(|f| f.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut store = MemoryVectorStore::new(self.embedder.dimension());
        store.add(
            fragments
                .into_iter()
                .zip(vectors)
                .map(|(fragment, vector)| VectorStoreEntry { fragment, vector })
                .collect(),
        )?;

        info!(
            "ingestion of '{}' complete: {} fragments, {}d vectors",
            file_name,
            store.len(),
            store.dimension()
        );
        Ok(StoreHandle {
            document_id,
            file_name: file_name.to_string(),
            store: Arc::new(store),
        })
    }

    /// Assemble context text for a query against the given store.
    ///
    /// An absent store yields an empty context without error; no document
    /// loaded is a valid state for a plain-knowledge conversation. A
    /// query-time embedding failure degrades to an empty context with the
    /// error recorded in `RetrievedContext::degraded`. A store whose
    /// dimension disagrees with this retriever's embedder is a caller error.
    pub async fn retrieve_context(
        &self,
        store: Option<&StoreHandle>,
        query: &str,
        k: usize,
    ) -> Result<RetrievedContext, ConfigError> {
        let handle = match store {
            Some(handle) => handle,
            None => return Ok(RetrievedContext::empty()),
        };

        if handle.dimension() != self.embedder.dimension() {
            return Err(ConfigError::DimensionMismatch {
                expected: self.embedder.dimension(),
                actual: handle.dimension(),
            });
        }

        let query_vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("query embedding failed, degrading to empty context: {}", e);
                return Ok(RetrievedContext::degraded(e));
            }
        };

        let results = handle.store.search(&query_vector, k);
        let fragment_count = results.len();
        let context = results
            .iter()
            .map(|(fragment, _)| fragment.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        debug!(
            "retrieved {} fragments for query against '{}'",
            fragment_count,
            handle.file_name()
        );
        Ok(RetrievedContext {
            context,
            fragment_count,
            degraded: None,
        })
    }
}

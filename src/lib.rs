// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod chunker;
pub mod completion;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod rag;
pub mod session;

// Re-export the retrieval core surface
pub use chunker::{split, ChunkConfig, Fragment};
pub use config::{
    CompletionConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, RagConfig, DEFAULT_TOP_K,
};
pub use document::{DocumentError, DocumentLoader};
pub use embeddings::{
    EmbeddingBackend, EmbeddingError, LocalEmbedder, RemoteEmbedder, RetryPolicy,
    MAX_BATCH_INPUTS,
};
pub use rag::{
    cosine_similarity, IngestError, MemoryVectorStore, RetrievedContext, Retriever, StoreHandle,
    VectorStore, VectorStoreEntry, CONTEXT_SEPARATOR,
};

// Re-export the orchestration surface
pub use completion::{ChatCompletionClient, CompletionBackend, CompletionError, Message};
pub use session::{ChatMessage, ChatSession, ChatTurn, IngestReport, SessionError};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Conversation orchestrator: owns the active document store and the
//! in-memory message history, and delegates generation to the completion
//! backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::completion::{CompletionBackend, CompletionError, Message};
use crate::config::ConfigError;
use crate::rag::{IngestError, Retriever, StoreHandle};

/// History messages carried into each completion call, most recent first
/// retained.
const HISTORY_WINDOW: usize = 10;

/// A message in the session transcript.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of one conversation turn.
#[derive(Debug)]
pub struct ChatTurn {
    pub reply: String,
    /// Fragments of document context injected into this turn's prompt.
    pub context_fragments: usize,
    /// Present when document retrieval degraded for this turn, e.g. the
    /// embedding service was unreachable at query time.
    pub warning: Option<String>,
}

/// Summary of a successful document attachment.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: Uuid,
    pub file_name: String,
    pub fragment_count: usize,
    pub dimension: usize,
}

/// Session-level failure of an attach or message operation.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One conversation with at most one attached document.
///
/// The store slot sits behind an `RwLock`: queries share read access while a
/// successful ingestion swaps the slot under the write lock, so a reader can
/// never observe a half-populated store.
pub struct ChatSession {
    id: Uuid,
    retriever: Arc<Retriever>,
    completion: Arc<dyn CompletionBackend>,
    store: RwLock<Option<StoreHandle>>,
    history: RwLock<Vec<ChatMessage>>,
    top_k: usize,
}

impl ChatSession {
    pub fn new(
        retriever: Arc<Retriever>,
        completion: Arc<dyn CompletionBackend>,
        top_k: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            retriever,
            completion,
            store: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            top_k,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ingest a document and make it the session's active store.
    ///
    /// The previous store is replaced only after ingestion fully succeeds;
    /// on failure it stays attached and queryable.
    pub async fn attach_document(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<IngestReport, SessionError> {
        let handle = self.retriever.ingest(bytes, file_name).await?;
        let report = IngestReport {
            document_id: handle.document_id(),
            file_name: handle.file_name().to_string(),
            fragment_count: handle.fragment_count(),
            dimension: handle.dimension(),
        };

        let mut slot = self.store.write().await;
        *slot = Some(handle);
        info!(
            "session {}: attached '{}' ({} fragments)",
            self.id, report.file_name, report.fragment_count
        );
        Ok(report)
    }

    /// Detach the active document, releasing its store memory immediately.
    ///
    /// Returns the detached file name, or `None` when no document was
    /// attached.
    pub async fn clear_document(&self) -> Option<String> {
        let mut slot = self.store.write().await;
        let cleared = slot.take().map(|handle| handle.file_name().to_string());
        if let Some(name) = &cleared {
            info!("session {}: cleared document '{}'", self.id, name);
        }
        cleared
    }

    /// Report on the currently attached document, if any.
    pub async fn document(&self) -> Option<IngestReport> {
        let slot = self.store.read().await;
        slot.as_ref().map(|handle| IngestReport {
            document_id: handle.document_id(),
            file_name: handle.file_name().to_string(),
            fragment_count: handle.fragment_count(),
            dimension: handle.dimension(),
        })
    }

    /// Run one conversation turn: retrieve context, build the prompt,
    /// generate a reply, and record both sides in the history.
    ///
    /// Retrieval degradation surfaces as a warning on the returned turn,
    /// never as a failed turn.
    pub async fn send_message(&self, text: &str) -> Result<ChatTurn, SessionError> {
        let retrieved = {
            let slot = self.store.read().await;
            self.retriever
                .retrieve_context(slot.as_ref(), text, self.top_k)
                .await?
        };

        let mut messages = vec![Message::system(render_system_prompt(&retrieved.context))];
        {
            let history = self.history.read().await;
            let start = history.len().saturating_sub(HISTORY_WINDOW);
            messages.extend(
                history[start..]
                    .iter()
                    .map(|m| Message {
                        role: m.role.clone(),
                        content: m.content.clone(),
                    }),
            );
        }
        messages.push(Message::user(text));

        let reply = self.completion.complete(&messages).await?;

        {
            let mut history = self.history.write().await;
            history.push(ChatMessage::user(text));
            history.push(ChatMessage::assistant(&reply));
        }

        let warning = retrieved
            .degraded
            .map(|e| format!("document retrieval unavailable for this turn: {e}"));
        Ok(ChatTurn {
            reply,
            context_fragments: retrieved.fragment_count,
            warning,
        })
    }
}

fn render_system_prompt(context: &str) -> String {
    let material = if context.is_empty() {
        "(no document loaded)"
    } else {
        context
    };
    format!(
        "You are a research assistant. Ground your answers in the reference material below.\n\n\
         Reference material:\n{material}\n\n\
         If the material does not contain the answer, say so explicitly, then answer from \
         general knowledge."
    )
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Text-generation capability consumed by the conversation orchestrator.
//!
//! The core's only coupling to generation is that it produces the context
//! string inserted into the system instruction; the client here is a thin
//! collaborator with no retry loop, and errors surface per conversation turn.

mod client;

pub use client::ChatCompletionClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One message on the chat-completion wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completion failure for one conversation turn.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion service unreachable: {0}")]
    Unreachable(String),

    #[error("completion request timed out after {0} seconds")]
    Timeout(u64),

    #[error("completion request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Generates a reply from a system instruction plus conversation history.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Model identifier, for logging and diagnostics.
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError>;
}

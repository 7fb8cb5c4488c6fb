// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding capability: text in, fixed-width vector out.
//!
//! Two backends implement the capability. `RemoteEmbedder` speaks the
//! OpenAI-compatible `/embeddings` protocol with request batching;
//! `LocalEmbedder` speaks the Ollama-compatible `/api/embeddings` protocol
//! one prompt at a time. Both retry transient failures with bounded
//! exponential backoff and enforce the declared vector dimension.

mod local;
mod remote;

pub use local::LocalEmbedder;
pub use remote::{RemoteEmbedder, MAX_BATCH_INPUTS};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Embedding service failure after the retry budget is exhausted, or a
/// response the caller must not accept.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Network-level failure: connection refused, DNS, or a 5xx from the service.
    #[error("embedding service unreachable: {0}")]
    Unreachable(String),

    /// The service answered but the body could not be interpreted.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    /// The configured request timeout expired.
    #[error("embedding request timed out after {0} seconds")]
    Timeout(u64),

    /// The service returned vectors of a width other than the declared one.
    #[error("embedding dimension mismatch: backend declares {declared}, service returned {actual}")]
    DimensionMismatch { declared: usize, actual: usize },

    /// The service rejected the request outright (4xx). Not retried.
    #[error("embedding request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl EmbeddingError {
    /// Whether the failure is transient and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::Unreachable(_) | EmbeddingError::Timeout(_)
        )
    }
}

/// Bounded exponential backoff for transient embedding failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(doubled.min(self.max_delay_ms))
    }
}

/// Maps text to a fixed-width numeric vector.
///
/// Implementations declare their dimensionality up front; every vector they
/// return has exactly that width or the call fails with
/// `EmbeddingError::DimensionMismatch`.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Width of every vector this backend produces.
    fn dimension(&self) -> usize;

    /// Model identifier, for logging and diagnostics.
    fn model(&self) -> &str;

    /// Embed a single text (typically a query).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Run `op`, retrying transient failures per the policy.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, EmbeddingError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, EmbeddingError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed on attempt {} of {}: {}; retrying in {:?}",
                    label,
                    attempt + 1,
                    policy.max_retries + 1,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Translate a reqwest transport error into the embedding taxonomy.
pub(crate) fn classify_send_error(
    err: reqwest::Error,
    timeout_secs: u64,
    guidance: Option<&str>,
) -> EmbeddingError {
    if err.is_timeout() {
        EmbeddingError::Timeout(timeout_secs)
    } else if err.is_connect() {
        match guidance {
            Some(hint) => EmbeddingError::Unreachable(format!("{err}; {hint}")),
            None => EmbeddingError::Unreachable(err.to_string()),
        }
    } else {
        EmbeddingError::Unreachable(err.to_string())
    }
}

/// Reject vectors whose width disagrees with the declared dimension.
pub(crate) fn check_dimension(declared: usize, vector: &[f32]) -> Result<(), EmbeddingError> {
    if vector.len() != declared {
        return Err(EmbeddingError::DimensionMismatch {
            declared,
            actual: vector.len(),
        });
    }
    Ok(())
}

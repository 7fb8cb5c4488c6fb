// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Ollama-compatible local embedding client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, EmbeddingConfig};

use super::{
    check_dimension, classify_send_error, with_retry, EmbeddingBackend, EmbeddingError,
    RetryPolicy,
};

/// Appended to connection failures so the user knows what to start.
const SERVICE_HINT: &str =
    "the local embedding service may not be running (start it with `ollama serve` and pull the model with `ollama pull <model>`)";

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for a locally hosted embedding service.
///
/// The service accepts one prompt per request, so batches become sequential
/// calls. Connection-refused failures carry guidance that the service may not
/// be running, distinct from malformed-response errors.
pub struct LocalEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    retry: RetryPolicy,
    timeout_secs: u64,
}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            retry: config.retry.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.endpoint);
        let body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout_secs, Some(SERVICE_HINT)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(EmbeddingError::Unreachable(format!(
                "embedding service returned HTTP {status}"
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        check_dimension(self.dimension, &parsed.embedding)?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingBackend for LocalEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        with_retry(&self.retry, "local embedding request", || self.request(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OpenAI-compatible remote embedding client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfigError, EmbeddingConfig};

use super::{
    check_dimension, classify_send_error, with_retry, EmbeddingBackend, EmbeddingError,
    RetryPolicy,
};

/// Hard cap on inputs per `/embeddings` request; larger batches are split.
pub const MAX_BATCH_INPUTS: usize = 96;

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for a hosted OpenAI-compatible embedding API.
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    api_key: String,
    retry: RetryPolicy,
    timeout_secs: u64,
}

impl RemoteEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let api_key = match &config.api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => return Err(ConfigError::MissingApiKey),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key,
            retry: config.retry.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// One `/embeddings` request for up to `MAX_BATCH_INPUTS` texts.
    async fn request(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.endpoint);
        let body = EmbeddingsRequest {
            model: &self.model,
            input: batch,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout_secs, None))?;

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

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        if parsed.data.len() != batch.len() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                parsed.data.len()
            )));
        }

        // The API is allowed to reorder; `index` restores input order.
        let mut data = parsed.data;
        data.sort_by_key(|item| item.index);

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            check_dimension(self.dimension, &item.embedding)?;
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingBackend for RemoteEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = vec![text.to_string()];
        let mut vectors = with_retry(&self.retry, "remote embedding request", || {
            self.request(&input)
        })
        .await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::MalformedResponse("empty embedding batch".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_INPUTS) {
            let embedded = with_retry(&self.retry, "remote embedding request", || {
                self.request(batch)
            })
            .await?;
            vectors.extend(embedded);
        }
        debug!(
            "embedded {} texts in {} request(s)",
            texts.len(),
            texts.len().div_ceil(MAX_BATCH_INPUTS)
        );
        Ok(vectors)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CompletionConfig, ConfigError};

use super::{CompletionBackend, CompletionError, Message};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.timeout_secs)
            } else {
                CompletionError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            CompletionError::MalformedResponse("response contains no choices".to_string())
        })?;

        debug!(
            "completion of {} messages produced {} characters",
            messages.len(),
            choice.message.content.len()
        );
        Ok(choice.message.content)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Typed configuration for the retrieval core.
//!
//! Every knob is an environment variable with a code default; `RagConfig::from_env`
//! reads them once at startup and validates the combination before anything is
//! constructed from it.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::chunker::ChunkConfig;
use crate::embeddings::{EmbeddingBackend, LocalEmbedder, RemoteEmbedder, RetryPolicy};

/// Fragments retrieved per query when the caller does not override it.
pub const DEFAULT_TOP_K: usize = 4;

const DEFAULT_REMOTE_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_REMOTE_MODEL: &str = "text-embedding-3-small";
const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_LOCAL_MODEL: &str = "nomic-embed-text";
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.deepseek.com/v1";
const DEFAULT_COMPLETION_MODEL: &str = "deepseek-chat";
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_COMPLETION_TEMPERATURE: f32 = 0.3;

/// Invalid configuration or invariant-violating parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("chunk overlap ({overlap}) must be greater than zero and smaller than chunk size ({chunk_size})")]
    InvalidOverlap { chunk_size: usize, overlap: usize },

    #[error("embedding dimension must be greater than zero")]
    ZeroDimension,

    /// A vector whose width disagrees with the store or backend it is used with.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector for fragment {index} contains NaN or infinite components")]
    NonFiniteVector { index: usize },

    #[error("unknown embedding backend '{0}' (expected 'remote' or 'local')")]
    UnknownBackend(String),

    #[error("EMBEDDING_API_KEY is required for the remote embedding backend")]
    MissingApiKey,

    #[error("invalid value '{value}' for {var}: {message}")]
    InvalidEnvValue {
        var: String,
        value: String,
        message: String,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Which embedding capability implementation serves this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted OpenAI-compatible embedding API.
    Remote,
    /// Locally running Ollama-compatible service.
    Local,
}

impl FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(EmbeddingProvider::Remote),
            "local" => Ok(EmbeddingProvider::Local),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingProvider::Remote => write!(f, "remote"),
            EmbeddingProvider::Local => write!(f, "local"),
        }
    }
}

/// Connection settings for one embedding backend.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            endpoint: DEFAULT_LOCAL_ENDPOINT.to_string(),
            model: DEFAULT_LOCAL_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            api_key: None,
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }
}

/// Connection settings for the chat-completion collaborator.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_COMPLETION_TIMEOUT_SECS,
            temperature: DEFAULT_COMPLETION_TEMPERATURE,
        }
    }
}

/// Full configuration surface of the retrieval core plus its collaborators.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunk: ChunkConfig,
    pub top_k: usize,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            top_k: DEFAULT_TOP_K,
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
        }
    }
}

impl RagConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Returns `ConfigError` for unparseable values and invalid combinations
    /// (zero chunk size, overlap >= chunk size, zero dimension, unknown backend,
    /// missing API key for the remote backend).
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match env::var("EMBEDDING_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => EmbeddingProvider::Local,
        };

        let (default_endpoint, default_model) = match provider {
            EmbeddingProvider::Remote => (DEFAULT_REMOTE_ENDPOINT, DEFAULT_REMOTE_MODEL),
            EmbeddingProvider::Local => (DEFAULT_LOCAL_ENDPOINT, DEFAULT_LOCAL_MODEL),
        };

        let config = Self {
            chunk: ChunkConfig {
                chunk_size: env_or("CHUNK_SIZE", ChunkConfig::default().chunk_size)?,
                overlap: env_or("CHUNK_OVERLAP", ChunkConfig::default().overlap)?,
            },
            top_k: env_or("RETRIEVAL_TOP_K", DEFAULT_TOP_K)?,
            embedding: EmbeddingConfig {
                provider,
                endpoint: env_string("EMBEDDING_ENDPOINT", default_endpoint),
                model: env_string("EMBEDDING_MODEL", default_model),
                dimension: env_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
                api_key: env::var("EMBEDDING_API_KEY").ok().filter(|k| !k.is_empty()),
                timeout_secs: env_or("EMBEDDING_TIMEOUT_SECS", DEFAULT_EMBEDDING_TIMEOUT_SECS)?,
                retry: RetryPolicy {
                    max_retries: env_or("EMBEDDING_MAX_RETRIES", RetryPolicy::default().max_retries)?,
                    ..RetryPolicy::default()
                },
            },
            completion: CompletionConfig {
                endpoint: env_string("COMPLETION_ENDPOINT", DEFAULT_COMPLETION_ENDPOINT),
                model: env_string("COMPLETION_MODEL", DEFAULT_COMPLETION_MODEL),
                api_key: env::var("COMPLETION_API_KEY").ok().filter(|k| !k.is_empty()),
                timeout_secs: env_or("COMPLETION_TIMEOUT_SECS", DEFAULT_COMPLETION_TIMEOUT_SECS)?,
                temperature: env_or("COMPLETION_TEMPERATURE", DEFAULT_COMPLETION_TEMPERATURE)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that span fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunk.validate()?;
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.embedding.provider == EmbeddingProvider::Remote && self.embedding.api_key.is_none()
        {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// Construct the configured embedding backend. Exactly one is active at a time.
    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingBackend>, ConfigError> {
        match self.embedding.provider {
            EmbeddingProvider::Remote => Ok(Arc::new(RemoteEmbedder::new(&self.embedding)?)),
            EmbeddingProvider::Local => Ok(Arc::new(LocalEmbedder::new(&self.embedding)?)),
        }
    }
}

fn env_string(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_or<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

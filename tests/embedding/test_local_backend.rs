// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Contract tests for the local embedding client: one prompt per request,
// connection-refused guidance, timeout tagging.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use fabstir_doc_chat::embeddings::{EmbeddingBackend, EmbeddingError, LocalEmbedder, RetryPolicy};
use fabstir_doc_chat::{EmbeddingConfig, EmbeddingProvider};

#[derive(Clone)]
struct ServerState {
    requests: Arc<AtomicUsize>,
    dimension: usize,
    response_delay: Duration,
}

/// Ollama-compatible `/api/embeddings` handler: one prompt per request.
async fn embeddings_handler(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if !state.response_delay.is_zero() {
        tokio::time::sleep(state.response_delay).await;
    }

    let prompt = body["prompt"].as_str().unwrap();
    let mut embedding = vec![0.5f32; state.dimension];
    embedding[0] = prompt.len() as f32;
    Json(json!({ "embedding": embedding })).into_response()
}

async fn serve(state: ServerState) -> String {
    let app = Router::new()
        .route("/api/embeddings", post(embeddings_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn local_config(endpoint: String, dimension: usize, timeout_secs: u64) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: EmbeddingProvider::Local,
        endpoint,
        model: "nomic-embed-text".to_string(),
        dimension,
        api_key: None,
        timeout_secs,
        retry: RetryPolicy {
            max_retries: 0,
            initial_delay_ms: 1,
            max_delay_ms: 4,
        },
    }
}

#[tokio::test]
async fn test_each_text_is_its_own_request() {
    let state = ServerState {
        requests: Arc::new(AtomicUsize::new(0)),
        dimension: 8,
        response_delay: Duration::ZERO,
    };
    let endpoint = serve(state.clone()).await;
    let embedder = LocalEmbedder::new(&local_config(endpoint, 8, 2)).unwrap();

    let texts: Vec<String> = vec!["a".into(), "bb".into(), "ccc".into()];
    let vectors = embedder.embed_batch(&texts).await.unwrap();

    assert_eq!(vectors.len(), 3);
    assert_eq!(state.requests.load(Ordering::SeqCst), 3);
    // Prompt length round-trips through component 0: order preserved.
    assert_eq!(vectors[0][0], 1.0);
    assert_eq!(vectors[1][0], 2.0);
    assert_eq!(vectors[2][0], 3.0);
}

#[tokio::test]
async fn test_connection_refused_carries_service_guidance() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let embedder = LocalEmbedder::new(&local_config(format!("http://{addr}"), 8, 2)).unwrap();
    let result = embedder.embed("hello").await;

    match result {
        Err(EmbeddingError::Unreachable(message)) => {
            assert!(
                message.contains("may not be running"),
                "guidance missing from: {message}"
            );
        }
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_response_is_distinct_from_unreachable() {
    let app = Router::new().route(
        "/api/embeddings",
        post(|| async { (StatusCode::OK, "{\"unexpected\": true}") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let embedder = LocalEmbedder::new(&local_config(format!("http://{addr}"), 8, 2)).unwrap();
    let result = embedder.embed("hello").await;

    assert!(matches!(result, Err(EmbeddingError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_slow_service_times_out_with_the_timeout_tag() {
    let state = ServerState {
        requests: Arc::new(AtomicUsize::new(0)),
        dimension: 8,
        response_delay: Duration::from_secs(5),
    };
    let endpoint = serve(state).await;
    let embedder = LocalEmbedder::new(&local_config(endpoint, 8, 1)).unwrap();

    let result = embedder.embed("hello").await;

    assert!(matches!(result, Err(EmbeddingError::Timeout(1))));
}

#[tokio::test]
async fn test_wrong_width_vectors_are_a_dimension_mismatch() {
    let state = ServerState {
        requests: Arc::new(AtomicUsize::new(0)),
        dimension: 4,
        response_delay: Duration::ZERO,
    };
    let endpoint = serve(state).await;
    // Client declares 8 but the service answers with 4-wide vectors.
    let embedder = LocalEmbedder::new(&local_config(endpoint, 8, 2)).unwrap();

    let result = embedder.embed("hello").await;

    assert!(matches!(
        result,
        Err(EmbeddingError::DimensionMismatch {
            declared: 8,
            actual: 4
        })
    ));
}

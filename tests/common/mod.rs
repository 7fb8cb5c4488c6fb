// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Shared fixtures and hand-rolled mock backends for the integration suites.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fabstir_doc_chat::completion::{CompletionBackend, CompletionError, Message};
use fabstir_doc_chat::embeddings::{EmbeddingBackend, EmbeddingError};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Deterministic embedder: each text maps to a vector derived from its bytes,
/// so identical texts always land on identical vectors and similar runs stay
/// reproducible.
pub struct MockEmbedder {
    dimension: usize,
    delay: Option<Duration>,
    fail: AtomicBool,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            delay: None,
            fail: AtomicBool::new(false),
        }
    }

    /// Embedder whose calls take `delay`, for exercising in-flight overlap.
    pub fn with_delay(dimension: usize, delay: Duration) -> Self {
        Self {
            dimension,
            delay: Some(delay),
            fail: AtomicBool::new(false),
        }
    }

    /// Toggle failure mode; subsequent calls return `Unreachable`.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn vector_for(dimension: usize, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % dimension] += f32::from(byte) / 255.0;
        }
        vector
    }

    fn check_available(&self) -> Result<(), EmbeddingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Unreachable("mock embedder offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        "mock-embedder"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        Ok(Self::vector_for(self.dimension, text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        Ok(texts
            .iter()
            .map(|text| Self::vector_for(self.dimension, text))
            .collect())
    }
}

/// Completion backend that records every request and answers with a canned
/// reply.
pub struct MockCompletion {
    reply: String,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl MockCompletion {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Vec<Message> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no completion request captured")
    }
}

#[async_trait]
impl CompletionBackend for MockCompletion {
    fn model(&self) -> &str {
        "mock-completion"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

/// Build a minimal well-formed PDF with one page per entry in `pages`.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize fixture PDF");
    bytes
}

/// Single-page PDF fixture.
pub fn pdf_with_text(text: &str) -> Vec<u8> {
    pdf_with_pages(&[text])
}

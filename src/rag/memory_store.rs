// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! In-memory vector store with brute-force cosine search.
//!
//! Entries keep insertion order so that score ties resolve to the earlier
//! fragment. The linear scan is deliberate: corpora here are single-document
//! and bounded to low thousands of fragments, so an approximate index would
//! buy nothing. The `VectorStore` contract (ranked top-k by cosine
//! similarity) holds regardless of the search strategy behind it.

use crate::chunker::Fragment;
use crate::config::ConfigError;

/// One fragment paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct VectorStoreEntry {
    pub fragment: Fragment,
    pub vector: Vec<f32>,
}

/// Capability contract for fragment-vector storage.
///
/// Search returns the k entries most similar to the query in descending
/// score order; `k` clamps to the number of stored entries and an empty
/// store yields an empty result, never an error.
pub trait VectorStore: Send + Sync {
    /// Vector width every entry must have.
    fn dimension(&self) -> usize;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-k cosine search, ties broken by insertion order.
    fn search(&self, query: &[f32], k: usize) -> Vec<(Fragment, f32)>;
}

/// Cosine similarity with a defensive zero for zero-magnitude or
/// mismatched-width vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Insertion-ordered in-memory store with a fixed dimension declared at
/// construction.
#[derive(Debug)]
pub struct MemoryVectorStore {
    dimension: usize,
    entries: Vec<VectorStoreEntry>,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    /// Append entries, rejecting dimension mismatches and non-finite
    /// components before anything is stored.
    pub fn add(&mut self, entries: Vec<VectorStoreEntry>) -> Result<(), ConfigError> {
        for entry in &entries {
            if entry.vector.len() != self.dimension {
                return Err(ConfigError::DimensionMismatch {
                    expected: self.dimension,
                    actual: entry.vector.len(),
                });
            }
            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::NonFiniteVector {
                    index: entry.fragment.index,
                });
            }
        }
        self.entries.extend(entries);
        Ok(())
    }
}

impl VectorStore for MemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(Fragment, f32)> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(query, &entry.vector)))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(self.entries.len()));

        scored
            .into_iter()
            .map(|(position, score)| (self.entries[position].fragment.clone(), score))
            .collect()
    }
}

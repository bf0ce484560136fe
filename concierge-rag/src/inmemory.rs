//! In-memory vector index using cosine similarity.
//!
//! [`InMemoryVectorIndex`] is a zero-dependency index backed by a
//! `HashMap` behind a `tokio::sync::RwLock`, suitable for local
//! development and tests where no Vectorize index is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexEntry, Match};
use crate::error::Result;
use crate::index::VectorIndex;

/// An in-memory [`VectorIndex`] using cosine similarity for search.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<HashMap<String, IndexEntry>>,
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Return `true` if the index holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. Negative
/// similarities clamp to zero so scores stay within `[0, 1]`.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).max(0.0)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut store = self.entries.write().await;
        for entry in entries {
            store.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Match>> {
        let store = self.entries.read().await;
        let mut scored: Vec<Match> = store
            .values()
            .map(|entry| Match {
                id: entry.id.clone(),
                score: cosine_similarity(&entry.vector, vector),
                metadata: entry.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

//! Vector index trait for storing entries and nearest-neighbor search.

use async_trait::async_trait;

use crate::document::{IndexEntry, Match};
use crate::error::Result;

/// An external storage backend for vector entries with similarity search.
///
/// The index owns the entries; the pipeline never caches them beyond a
/// single retrieval call.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries by id.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Return the `top_k` nearest entries to the given vector, ordered by
    /// descending similarity score.
    ///
    /// Results carry metadata but not the stored vectors.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Match>>;
}

//! Data types for documents, index entries, and retrieval matches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A unit of knowledge submitted for indexing.
///
/// A missing `id` is assigned a generated UUID during ingestion.
/// Re-ingesting a document with the same `id` replaces the stored entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document, if the caller supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with an explicit id and no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: Some(id.into()), text: text.into(), metadata: HashMap::new() }
    }
}

/// An entry persisted in the vector index.
///
/// All entries in one index share the dimensionality fixed by the
/// embedding provider. Metadata always carries the original document
/// text under `"text"` so retrieval can recover body text without a
/// second lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// Unique identifier, matching the source document's id.
    pub id: String,
    /// The embedding vector for the document text.
    pub vector: Vec<f32>,
    /// Document metadata plus the original text.
    pub metadata: HashMap<String, String>,
}

/// A single retrieval result: an index entry reference with its
/// similarity score. Matches are transient within one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// The id of the matched index entry.
    pub id: String,
    /// Similarity score in `[0, 1]` (higher is more relevant).
    pub score: f32,
    /// Metadata of the matched entry.
    pub metadata: HashMap<String, String>,
}

/// A normalized user request produced by the input normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Trimmed, whitespace-collapsed question text. Never empty.
    pub text: String,
    /// Number of nearest entries to retrieve, clamped to configured bounds.
    pub top_k: usize,
}

/// The result of an ingestion batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    /// Number of entries upserted into the vector index.
    pub indexed: usize,
}

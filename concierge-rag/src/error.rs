//! Error types for the `concierge-rag` crate.

use thiserror::Error;

/// Errors that can occur in the answer and ingestion pipelines.
#[derive(Debug, Error)]
pub enum RagError {
    /// The request body could not be resolved into a usable query or batch.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required provider binding is not configured.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index backend.
    #[error("Vector index error ({backend}): {message}")]
    Index {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during text generation.
    #[error("Generation error ({model}): {message}")]
    Generation {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// Ingestion produced a different number of vectors than documents.
    ///
    /// The batch is rejected wholesale; no entries are written.
    #[error("Embedding count mismatch: got {actual} vectors for {expected} documents")]
    EmbeddingMismatch {
        /// The number of documents submitted for embedding.
        expected: usize,
        /// The number of vectors the provider returned.
        actual: usize,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;

//! Retrieval-augmented question answering core for the Concierge assistant.
//!
//! This crate provides:
//! - Capability traits for the external services: [`EmbeddingProvider`],
//!   [`VectorIndex`], [`TextGenerator`]
//! - The [`AnswerPipeline`] orchestrating retrieval, context assembly,
//!   model selection, generation fallback, and citations
//! - The ingestion path turning document batches into index entries
//! - An in-memory index for local use and Cloudflare Workers AI /
//!   Vectorize backends (behind the `cloudflare` feature)

pub mod answer;
#[cfg(feature = "cloudflare")]
pub mod cloudflare;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod pipeline;
pub mod policy;
pub mod query;
pub mod seed;

pub use answer::{Answer, AnswerMode, ConfidenceLabel, SourceRef};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use context::{AssembledContext, ContextBlock};
pub use document::{Document, IndexEntry, IngestReport, Match, Query};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{ChatPrompt, GenerationParams, TextGenerator};
pub use index::VectorIndex;
pub use inmemory::InMemoryVectorIndex;
pub use pipeline::{AnswerPipeline, AnswerPipelineBuilder};
pub use policy::{IntentMatcher, ModelChoice, ModelTier, Strictness};

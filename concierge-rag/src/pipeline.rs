//! Pipeline orchestrator for the query and ingestion paths.
//!
//! [`AnswerPipeline`] composes an [`EmbeddingProvider`], a
//! [`VectorIndex`], and a [`TextGenerator`] behind the decision policy:
//! confidence-scored retrieval, context assembly, adaptive model
//! selection, citation enforcement, and multi-tier fallback. Each
//! request is one stateless unit of work; nothing is cached between
//! requests.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::answer::{Answer, AnswerMode, SourceRef};
use crate::config::PipelineConfig;
use crate::context::{self, AssembledContext};
use crate::document::{Document, IndexEntry, IngestReport, Match, Query};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generate::{self, MODEL_NONE};
use crate::generation::{ChatPrompt, TextGenerator};
use crate::index::VectorIndex;
use crate::policy::{self, IntentMatcher};
use crate::query;
use crate::seed;

/// Fixed reply for the degraded no-provider path.
pub const NO_PROVIDER_TEXT: &str = "Running without an AI provider. Set \
    CLOUDFLARE_ACCOUNT_ID and CLOUDFLARE_API_TOKEN (and optionally \
    VECTORIZE_INDEX) to enable answers. The /chat route is reachable.";

/// Canned reply for the conversational greeting shortcut.
pub const GREETING_TEXT: &str = "Hello! I'm the site assistant. Ask me about \
    our services, pricing, how to get started, or how to contact the team.";

/// The answer and ingestion pipeline orchestrator.
///
/// Providers are optional by design: a missing embedding/generation
/// provider degrades the query path to a fixed no-provider answer, and a
/// missing vector index degrades retrieval to general-knowledge mode.
/// Ingestion, by contrast, requires both the provider and the index.
pub struct AnswerPipeline {
    config: PipelineConfig,
    matcher: IntentMatcher,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AnswerPipeline {
    /// Create a new [`AnswerPipelineBuilder`].
    pub fn builder() -> AnswerPipelineBuilder {
        AnswerPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer one request body.
    ///
    /// All provider flakiness is absorbed into degraded-but-successful
    /// answers; the only error this returns is [`RagError::InvalidInput`]
    /// for an empty/unresolvable question.
    pub async fn answer(&self, body: &Value) -> Result<Answer> {
        let query = query::normalize(body, &self.config)?;

        let (Some(embedder), Some(generator)) = (&self.embedder, &self.generator) else {
            info!("no provider configured, returning degraded answer");
            return Ok(self.no_provider_answer());
        };

        let mut diagnostics = Vec::new();
        let (matches, confidence) =
            self.retrieve(embedder.as_ref(), &query, &mut diagnostics).await;
        let ctx = context::assemble(&matches, &self.config);
        let mode = if ctx.is_empty() { AnswerMode::General } else { AnswerMode::Rag };

        if mode == AnswerMode::General && self.matcher.is_greeting(&query.text) {
            info!("greeting shortcut, skipping generation");
            return Ok(Answer {
                answer: GREETING_TEXT.to_string(),
                mode,
                confidence,
                confidence_label: policy::confidence_label(confidence, &self.config),
                model_used: MODEL_NONE.to_string(),
                sources: Vec::new(),
                diagnostics,
            });
        }

        let choice =
            policy::select_model(confidence, &query.text, mode, &self.matcher, &self.config);
        let prompt = ChatPrompt {
            system: generate::system_prompt(choice.strictness, &self.config),
            user: generate::user_prompt(&query.text, &ctx.joined),
        };
        let (text, model_used) = generate::generate_with_fallback(
            generator.as_ref(),
            choice,
            &prompt,
            &self.config,
            &mut diagnostics,
        )
        .await;

        let (text, sources) = self.compose_citations(text, &matches, &ctx);

        info!(
            mode = ?mode,
            confidence,
            model = %model_used,
            source_count = sources.len(),
            "answer composed"
        );

        Ok(Answer {
            answer: text,
            mode,
            confidence,
            confidence_label: policy::confidence_label(confidence, &self.config),
            model_used,
            sources,
            diagnostics,
        })
    }

    /// Ingest a batch of documents: embed once, upsert one entry each.
    ///
    /// An empty batch with `use_seed` substitutes the built-in seed
    /// corpus. Unlike the query path, a missing provider or index is a
    /// fatal configuration error here, and a blank document or an
    /// embedding count irregularity rejects the whole batch with zero
    /// upserts.
    pub async fn ingest(&self, documents: Vec<Document>, use_seed: bool) -> Result<IngestReport> {
        let documents = if documents.is_empty() && use_seed {
            info!("empty batch with seed flag, ingesting built-in seed corpus");
            seed::seed_documents()
        } else {
            documents
        };
        if documents.is_empty() {
            return Err(RagError::InvalidInput("no documents to ingest".to_string()));
        }
        if let Some(position) = documents.iter().position(|d| d.text.trim().is_empty()) {
            return Err(RagError::InvalidInput(format!(
                "document at position {position} has empty text"
            )));
        }

        let embedder = self.embedder.as_ref().ok_or_else(|| {
            RagError::ProviderUnavailable("ingestion requires an embedding provider".to_string())
        })?;
        let index = self.index.as_ref().ok_or_else(|| {
            RagError::ProviderUnavailable("ingestion requires a vector index".to_string())
        })?;

        // One batched embedding call, one vector per document's own text.
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(RagError::EmbeddingMismatch {
                expected: documents.len(),
                actual: vectors.len(),
            });
        }

        let entries: Vec<IndexEntry> = documents
            .into_iter()
            .zip(vectors)
            .map(|(doc, vector)| {
                let id = doc.id.unwrap_or_else(|| Uuid::new_v4().to_string());
                let mut metadata = doc.metadata;
                // Persist the body so retrieval can recover it without a
                // second lookup.
                metadata.insert("text".to_string(), doc.text);
                IndexEntry { id, vector, metadata }
            })
            .collect();

        index.upsert(&entries).await?;
        let indexed = entries.len();
        info!(indexed, "ingested document batch");
        Ok(IngestReport { indexed })
    }

    /// Embed the query and search the index.
    ///
    /// Returns the ranked matches and the maximum score over all of
    /// them (pre-filter). Every failure degrades to empty matches and a
    /// diagnostic note; retrieval is never fatal to the request.
    async fn retrieve(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &Query,
        diagnostics: &mut Vec<String>,
    ) -> (Vec<Match>, f32) {
        let vector = match embedder.embed(&query.text).await {
            Ok(vector) if !vector.is_empty() => vector,
            Ok(_) => {
                warn!("embedding provider returned an empty vector");
                diagnostics.push("query embedding was empty".to_string());
                return (Vec::new(), 0.0);
            }
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                diagnostics.push(format!("query embedding failed: {e}"));
                return (Vec::new(), 0.0);
            }
        };

        let Some(index) = &self.index else {
            diagnostics.push("no vector index configured".to_string());
            return (Vec::new(), 0.0);
        };

        let mut matches = match index.query(&vector, query.top_k).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "vector index query failed");
                diagnostics.push(format!("vector index query failed: {e}"));
                return (Vec::new(), 0.0);
            }
        };

        matches
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let confidence = matches.iter().map(|m| m.score).fold(0.0, f32::max);
        (matches, confidence)
    }

    /// Attach citations. Sources come from the blocks themselves, one
    /// per surviving block in order, so citation *n* always names the
    /// match that produced block *n* even when the assembler skipped a
    /// score-passing match as textless or duplicate.
    fn compose_citations(
        &self,
        text: String,
        matches: &[Match],
        ctx: &AssembledContext,
    ) -> (String, Vec<SourceRef>) {
        if ctx.is_empty() {
            return (text, Vec::new());
        }
        let sources: Vec<SourceRef> = ctx
            .blocks
            .iter()
            .filter_map(|block| matches.iter().find(|m| m.id == block.source_id))
            .map(|m| SourceRef { id: m.id.clone(), meta: m.metadata.clone() })
            .collect();
        let text = generate::append_citations(text, sources.len());
        (text, sources)
    }

    fn no_provider_answer(&self) -> Answer {
        Answer {
            answer: NO_PROVIDER_TEXT.to_string(),
            mode: AnswerMode::NoProvider,
            confidence: 0.0,
            confidence_label: policy::confidence_label(0.0, &self.config),
            model_used: MODEL_NONE.to_string(),
            sources: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Builder for constructing an [`AnswerPipeline`].
///
/// Every provider is optional; the pipeline degrades per the policy in
/// [`AnswerPipeline`] when one is absent.
#[derive(Default)]
pub struct AnswerPipelineBuilder {
    config: Option<PipelineConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AnswerPipelineBuilder {
    /// Set the pipeline configuration (defaults otherwise).
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector index backend.
    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the text generation provider.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`AnswerPipeline`], compiling the intent matcher.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] when a keyword pattern set does not
    /// compile.
    pub fn build(self) -> Result<AnswerPipeline> {
        let config = self.config.unwrap_or_default();
        let matcher = IntentMatcher::compile(&config)?;
        Ok(AnswerPipeline {
            config,
            matcher,
            embedder: self.embedder,
            index: self.index,
            generator: self.generator,
        })
    }
}

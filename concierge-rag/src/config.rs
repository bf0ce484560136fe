//! Configuration for the answer pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default aliases checked, in order, when resolving the question text
/// from a request body.
pub const DEFAULT_QUERY_ALIASES: &[&str] = &["query", "question", "q", "message"];

/// Default greeting tokens that trigger the conversational shortcut.
pub const DEFAULT_GREETING_PATTERNS: &[&str] =
    &["hi", "hello", "hey", "good morning", "good afternoon", "thanks", "thank you"];

/// Default analytical-intent keywords that force the large model.
pub const DEFAULT_ANALYTICAL_PATTERNS: &[&str] = &[
    "summar(y|ize|ise)",
    "compar(e|ison)",
    "pros and cons",
    "strategic",
    "executive",
    "roadmap",
    "architecture",
];

/// Configuration parameters for the answer and ingestion pipelines.
///
/// Thresholds and caps default to the production values; the greeting and
/// analytical keyword sets are locale-specific and meant to be replaced
/// per deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// `topK` used when the request does not supply one.
    pub default_top_k: usize,
    /// Lower bound for `topK`; non-numeric input also maps here.
    pub min_top_k: usize,
    /// Upper bound for `topK`.
    pub max_top_k: usize,
    /// Minimum similarity score for a match to enter the context.
    pub min_score: f32,
    /// Confidence at or above which RAG-only strict prompting is enabled.
    pub strict_score: f32,
    /// Confidence below which the large model is selected.
    pub escalate_below: f32,
    /// Maximum number of context blocks per answer.
    pub max_context_blocks: usize,
    /// Maximum joined character length of the assembled context.
    pub max_context_chars: usize,
    /// Identifier of the large (high-capacity) model.
    pub large_model: String,
    /// Identifier of the small (fast) model.
    pub small_model: String,
    /// Identifier of the embedding model.
    pub embedding_model: String,
    /// Aliases checked, in order, for the question text.
    pub query_aliases: Vec<String>,
    /// Greeting tokens (regex alternatives, matched on word boundaries,
    /// case-insensitive).
    pub greeting_patterns: Vec<String>,
    /// Analytical-intent keywords (regex alternatives, matched on word
    /// boundaries, case-insensitive).
    pub analytical_patterns: Vec<String>,
    /// Name the assistant persona introduces itself with.
    pub persona: String,
    /// Language the assistant answers in.
    pub language: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            min_top_k: 1,
            max_top_k: 16,
            min_score: 0.60,
            strict_score: 0.70,
            escalate_below: 0.55,
            max_context_blocks: 5,
            max_context_chars: 1800,
            large_model: "@cf/meta/llama-3.1-70b-instruct".to_string(),
            small_model: "@cf/meta/llama-3.1-8b-instruct".to_string(),
            embedding_model: "@cf/baai/bge-base-en-v1.5".to_string(),
            query_aliases: DEFAULT_QUERY_ALIASES.iter().map(|s| s.to_string()).collect(),
            greeting_patterns: DEFAULT_GREETING_PATTERNS.iter().map(|s| s.to_string()).collect(),
            analytical_patterns: DEFAULT_ANALYTICAL_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            persona: "Concierge".to_string(),
            language: "English".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for constructing a [`PipelineConfig`].
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the default `topK` applied when the request omits one.
    pub fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Set the `topK` clamping bounds.
    pub fn top_k_bounds(mut self, min: usize, max: usize) -> Self {
        self.config.min_top_k = min;
        self.config.max_top_k = max;
        self
    }

    /// Set the minimum similarity score for context inclusion.
    pub fn min_score(mut self, score: f32) -> Self {
        self.config.min_score = score;
        self
    }

    /// Set the confidence threshold enabling strict RAG-only prompting.
    pub fn strict_score(mut self, score: f32) -> Self {
        self.config.strict_score = score;
        self
    }

    /// Set the confidence threshold below which the large model is used.
    pub fn escalate_below(mut self, score: f32) -> Self {
        self.config.escalate_below = score;
        self
    }

    /// Set the maximum number of context blocks.
    pub fn max_context_blocks(mut self, blocks: usize) -> Self {
        self.config.max_context_blocks = blocks;
        self
    }

    /// Set the maximum joined character length of the context.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the large and small generation model identifiers.
    pub fn models(mut self, large: impl Into<String>, small: impl Into<String>) -> Self {
        self.config.large_model = large.into();
        self.config.small_model = small.into();
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Replace the question-text alias chain.
    pub fn query_aliases(mut self, aliases: Vec<String>) -> Self {
        self.config.query_aliases = aliases;
        self
    }

    /// Replace the greeting token set.
    pub fn greeting_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.greeting_patterns = patterns;
        self
    }

    /// Replace the analytical-intent keyword set.
    pub fn analytical_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.analytical_patterns = patterns;
        self
    }

    /// Set the assistant persona name.
    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.config.persona = persona.into();
        self
    }

    /// Set the answer language.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    /// Build the [`PipelineConfig`], validating that parameters are
    /// consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - any score threshold is outside `[0, 1]`
    /// - `min_top_k` is zero or exceeds `max_top_k`
    /// - a context cap is zero
    /// - the query alias chain is empty
    pub fn build(self) -> Result<PipelineConfig> {
        let c = &self.config;
        for (name, value) in [
            ("min_score", c.min_score),
            ("strict_score", c.strict_score),
            ("escalate_below", c.escalate_below),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RagError::Config(format!(
                    "{name} ({value}) must be within [0, 1]"
                )));
            }
        }
        if c.min_top_k == 0 || c.min_top_k > c.max_top_k {
            return Err(RagError::Config(format!(
                "top_k bounds [{}, {}] are invalid",
                c.min_top_k, c.max_top_k
            )));
        }
        if c.max_context_blocks == 0 || c.max_context_chars == 0 {
            return Err(RagError::Config("context caps must be greater than zero".to_string()));
        }
        if c.query_aliases.is_empty() {
            return Err(RagError::Config("query alias chain must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = PipelineConfig::builder().min_score(1.5).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn inverted_top_k_bounds_are_rejected() {
        let err = PipelineConfig::builder().top_k_bounds(10, 2).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn zero_context_cap_is_rejected() {
        let err = PipelineConfig::builder().max_context_blocks(0).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }
}

//! Decision policy: model tier, prompting strictness, and intent matching.
//!
//! The policy is a pure decision table over (confidence, intent, mode) so
//! it can be tested in isolation from the provider calls.

use regex::Regex;

use crate::answer::{AnswerMode, ConfidenceLabel};
use crate::config::PipelineConfig;
use crate::error::{RagError, Result};

/// Which generation model size to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// High-capacity model for low-confidence or analytical requests.
    Large,
    /// Fast model for confident, conversational requests.
    Small,
}

/// How far the model may stray from the supplied context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Answer exclusively from context; refuse when it is insufficient.
    Strict,
    /// Prefer context but allow general knowledge.
    Relaxed,
}

/// The outcome of model selection: size and prompting regime.
///
/// The two axes are orthogonal: size answers "how much reasoning
/// capacity", strictness answers "how much may the model improvise".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelChoice {
    /// Selected model size.
    pub tier: ModelTier,
    /// Selected prompting regime.
    pub strictness: Strictness,
}

/// Compiled keyword sets for greeting and analytical-intent detection.
///
/// Patterns are configuration (they are locale-specific); the matching
/// semantics — case-insensitive, word-boundary — are fixed here.
#[derive(Debug)]
pub struct IntentMatcher {
    greeting: Regex,
    analytical: Regex,
}

impl IntentMatcher {
    /// Compile the matcher from the configured pattern sets.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] when a pattern set does not compile.
    pub fn compile(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            greeting: compile_word_set(&config.greeting_patterns, "greeting")?,
            analytical: compile_word_set(&config.analytical_patterns, "analytical")?,
        })
    }

    /// Whether the text is a bare greeting eligible for the
    /// conversational shortcut.
    pub fn is_greeting(&self, text: &str) -> bool {
        self.greeting.is_match(text)
    }

    /// Whether the text signals analytical intent (summaries,
    /// comparisons, strategy) that warrants the large model.
    pub fn is_analytical(&self, text: &str) -> bool {
        self.analytical.is_match(text)
    }
}

fn compile_word_set(patterns: &[String], name: &str) -> Result<Regex> {
    if patterns.is_empty() {
        // An empty set matches nothing.
        return Regex::new("$^")
            .map_err(|e| RagError::Config(format!("{name} pattern set: {e}")));
    }
    let joined = patterns.join("|");
    Regex::new(&format!(r"(?i)\b(?:{joined})\b"))
        .map_err(|e| RagError::Config(format!("{name} pattern set: {e}")))
}

/// Select the model tier and strictness for one request.
///
/// The large model is required when confidence falls below the
/// escalation threshold or the text matches an analytical keyword.
/// Strict RAG-only prompting is enabled when the request runs in RAG
/// mode with confidence at or above the strict threshold.
pub fn select_model(
    confidence: f32,
    text: &str,
    mode: AnswerMode,
    matcher: &IntentMatcher,
    config: &PipelineConfig,
) -> ModelChoice {
    let tier = if confidence < config.escalate_below || matcher.is_analytical(text) {
        ModelTier::Large
    } else {
        ModelTier::Small
    };
    let strictness = if mode == AnswerMode::Rag && confidence >= config.strict_score {
        Strictness::Strict
    } else {
        Strictness::Relaxed
    };
    ModelChoice { tier, strictness }
}

/// Derive the coarse confidence tier reported in the answer.
pub fn confidence_label(confidence: f32, config: &PipelineConfig) -> ConfidenceLabel {
    if confidence >= config.strict_score {
        ConfidenceLabel::High
    } else if confidence >= config.escalate_below {
        ConfidenceLabel::Medium
    } else if confidence > 0.0 {
        ConfidenceLabel::Low
    } else {
        ConfidenceLabel::None
    }
}

//! The final answer shape returned by the query pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How the answer was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerMode {
    /// At least one context block survived the relevance filters.
    Rag,
    /// No usable context; the model answered from general knowledge.
    General,
    /// No embedding/generation provider is configured.
    NoProvider,
}

/// A coarse tier derived from the retrieval confidence score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    /// Confidence at or above the strict-RAG threshold.
    High,
    /// Confidence at or above the model-escalation threshold.
    Medium,
    /// Some retrieval signal, below the escalation threshold.
    Low,
    /// No matches were retrieved.
    None,
}

/// A cited source attached to an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// The id of the cited index entry.
    pub id: String,
    /// Metadata of the cited entry.
    pub meta: HashMap<String, String>,
}

/// The final output of the query pipeline.
///
/// Every pipeline path (including degraded ones) terminates in an
/// `Answer` with non-empty text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// The generated (or canned) answer text. Never empty.
    pub answer: String,
    /// How the answer was produced.
    pub mode: AnswerMode,
    /// Maximum similarity score observed across all retrieved matches,
    /// 0 if none. Reflects retrieval quality independent of the stricter
    /// context-inclusion threshold.
    pub confidence: f32,
    /// Tier derived from `confidence`.
    pub confidence_label: ConfidenceLabel,
    /// Identifier of the model that produced the text, or `"none"`.
    pub model_used: String,
    /// Cited matches, positionally aligned with the context blocks.
    pub sources: Vec<SourceRef>,
    /// Free-form troubleshooting notes. Non-contractual.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

//! Answer generation: prompt construction, tiered fallback, citations.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::generation::{ChatPrompt, GenerationParams, TextGenerator};
use crate::policy::{ModelChoice, ModelTier, Strictness};

/// Marker used in the user prompt when no context block survived.
pub const NO_CONTEXT_MARKER: &str = "(no relevant context available)";

/// Substituted when every generation attempt yields no text.
pub const APOLOGY_TEXT: &str = "I'm sorry, I couldn't produce an answer right now. \
    Please try again in a moment.";

/// Refusal sentence the strict prompt instructs the model to emit when
/// the context is insufficient.
pub const STRICT_REFUSAL: &str =
    "I don't have that information in the provided context.";

/// Model identifier reported when no model was invoked.
pub const MODEL_NONE: &str = "none";

static SOURCES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsources\s*:").expect("static regex"));

/// Build the system instruction for the given strictness tier.
///
/// The persona and answer language come from configuration; only the
/// strictness rules vary between tiers.
pub fn system_prompt(strictness: Strictness, config: &PipelineConfig) -> String {
    let base = format!(
        "You are the assistant for {persona}. Answer in {language} and cite \
         sources from the CONTEXT.",
        persona = config.persona,
        language = config.language,
    );
    match strictness {
        Strictness::Strict => format!(
            "{base} Answer exclusively from the CONTEXT. If the context does \
             not contain the answer, reply exactly: \"{STRICT_REFUSAL}\" Do \
             not use outside knowledge."
        ),
        Strictness::Relaxed => {
            format!("{base} If the context is missing information, say so.")
        }
    }
}

/// Build the user instruction: the question plus the assembled context,
/// or an explicit no-context marker.
pub fn user_prompt(question: &str, context: &str) -> String {
    let context = if context.is_empty() { NO_CONTEXT_MARKER } else { context };
    format!("Question: {question}\n\nCONTEXT:\n{context}")
}

/// Sampling parameters for a (tier, strictness) pair.
///
/// Temperature orders strict ≤ normal-large ≤ normal-small; the token
/// budget orders large ≥ small.
pub fn generation_params(tier: ModelTier, strictness: Strictness) -> GenerationParams {
    let temperature = match (strictness, tier) {
        (Strictness::Strict, _) => 0.15,
        (Strictness::Relaxed, ModelTier::Large) => 0.25,
        (Strictness::Relaxed, ModelTier::Small) => 0.35,
    };
    let max_tokens = match tier {
        ModelTier::Large => 600,
        ModelTier::Small => 280,
    };
    GenerationParams { temperature, max_tokens }
}

/// Run the generation call with mandatory fallback.
///
/// A failed large-tier call is retried once against the small tier with
/// the same prompts and small-tier parameters. A failed small-tier call
/// is not retried. When no attempt produced text, the fixed apology is
/// substituted, so the returned text is always non-empty. Returns the
/// text and the identifier of the model that was last invoked.
pub async fn generate_with_fallback(
    generator: &dyn TextGenerator,
    choice: ModelChoice,
    prompt: &ChatPrompt,
    config: &PipelineConfig,
    diagnostics: &mut Vec<String>,
) -> (String, String) {
    let primary = match choice.tier {
        ModelTier::Large => config.large_model.as_str(),
        ModelTier::Small => config.small_model.as_str(),
    };
    let params = generation_params(choice.tier, choice.strictness);

    let mut model_used = primary.to_string();
    let mut text = match generator.generate(primary, prompt, params).await {
        Ok(text) => text,
        Err(e) => {
            warn!(model = primary, error = %e, "primary generation attempt failed");
            diagnostics.push(format!("generation failed on {primary}: {e}"));
            String::new()
        }
    };

    // One retry on the small tier, only when the large tier was primary.
    if text.trim().is_empty() && choice.tier == ModelTier::Large {
        let fallback = config.small_model.as_str();
        let params = generation_params(ModelTier::Small, choice.strictness);
        model_used = fallback.to_string();
        text = match generator.generate(fallback, prompt, params).await {
            Ok(text) => text,
            Err(e) => {
                warn!(model = fallback, error = %e, "fallback generation attempt failed");
                diagnostics.push(format!("generation failed on {fallback}: {e}"));
                String::new()
            }
        };
    }

    if text.trim().is_empty() {
        diagnostics.push("all generation attempts returned no text".to_string());
        text = APOLOGY_TEXT.to_string();
    } else {
        info!(model = %model_used, "generation completed");
    }

    (text, model_used)
}

/// Append a `Sources: [1], [2], …` line for the cited context blocks.
///
/// Idempotent: when the text already carries a recognizable sources
/// marker the input is returned unchanged. A zero citation count also
/// leaves the text untouched.
pub fn append_citations(text: String, citations: usize) -> String {
    if citations == 0 || SOURCES_RE.is_match(&text) {
        return text;
    }
    let indices: Vec<String> = (1..=citations).map(|i| format!("[{i}]")).collect();
    format!("{text}\n\nSources: {}", indices.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn strict_prompt_locks_to_context_and_fixes_the_refusal() {
        let prompt = system_prompt(Strictness::Strict, &config());
        assert!(prompt.contains("exclusively from the CONTEXT"));
        assert!(prompt.contains(STRICT_REFUSAL));
    }

    #[test]
    fn relaxed_prompt_allows_saying_info_is_missing() {
        let prompt = system_prompt(Strictness::Relaxed, &config());
        assert!(!prompt.contains(STRICT_REFUSAL));
        assert!(prompt.contains("missing information"));
    }

    #[test]
    fn user_prompt_marks_missing_context() {
        let prompt = user_prompt("what do you do?", "");
        assert!(prompt.contains(NO_CONTEXT_MARKER));
        let prompt = user_prompt("what do you do?", "### Doc 1\nbody");
        assert!(prompt.contains("### Doc 1"));
    }

    #[test]
    fn temperature_and_budget_preserve_the_ordering() {
        let strict_large = generation_params(ModelTier::Large, Strictness::Strict);
        let normal_large = generation_params(ModelTier::Large, Strictness::Relaxed);
        let normal_small = generation_params(ModelTier::Small, Strictness::Relaxed);

        assert!(strict_large.temperature <= normal_large.temperature);
        assert!(normal_large.temperature <= normal_small.temperature);
        assert!(normal_large.max_tokens >= normal_small.max_tokens);
    }

    #[test]
    fn citations_are_appended_in_order() {
        let text = append_citations("The answer.".to_string(), 3);
        assert!(text.ends_with("Sources: [1], [2], [3]"));
    }

    #[test]
    fn citation_append_is_idempotent() {
        let with_sources = "The answer.\n\nsources: [1]".to_string();
        assert_eq!(append_citations(with_sources.clone(), 2), with_sources);

        let appended = append_citations("The answer.".to_string(), 2);
        assert_eq!(append_citations(appended.clone(), 2), appended);
    }

    #[test]
    fn zero_citations_leave_the_text_unchanged() {
        assert_eq!(append_citations("General reply.".to_string(), 0), "General reply.");
    }
}

//! Text generation trait for producing answers from chat prompts.

use async_trait::async_trait;

use crate::error::Result;

/// A system/user prompt pair for a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    /// The system instruction (persona, language, strictness rules).
    pub system: String,
    /// The user instruction (question plus assembled context).
    pub user: String,
}

/// Sampling parameters for a generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget.
    pub max_tokens: u32,
}

/// A provider that turns a chat prompt into answer text.
///
/// Implementations wrap a specific model-serving backend. The pipeline
/// treats every call as independently fallible; failures are handled by
/// the tiered fallback in the answer generator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text with the named model.
    async fn generate(
        &self,
        model: &str,
        prompt: &ChatPrompt,
        params: GenerationParams,
    ) -> Result<String>;
}

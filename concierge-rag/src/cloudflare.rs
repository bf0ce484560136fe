//! Cloudflare Workers AI and Vectorize backends.
//!
//! [`WorkersAi`] implements both [`EmbeddingProvider`] and
//! [`TextGenerator`] over the Workers AI REST API; [`Vectorize`]
//! implements [`VectorIndex`] over the Vectorize v2 REST API. These are
//! the production counterparts of the `env.AI` and `env.VECTORIZE`
//! bindings available inside a Worker.
//!
//! This module is only available when the `cloudflare` feature is enabled.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::document::{IndexEntry, Match};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{ChatPrompt, GenerationParams, TextGenerator};
use crate::index::VectorIndex;

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Dimensionality of `@cf/baai/bge-base-en-v1.5` embeddings.
const BGE_BASE_DIMENSIONS: usize = 768;

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

fn first_error(errors: &[ApiMessage]) -> String {
    errors.first().map(|e| e.message.clone()).unwrap_or_else(|| "unknown API error".to_string())
}

// ── Workers AI ─────────────────────────────────────────────────────

/// An embedding and generation client backed by Cloudflare Workers AI.
///
/// Calls `POST /accounts/{account}/ai/run/{model}` with a bearer token.
/// The embedding model is fixed at construction; generation models are
/// chosen per call by the pipeline's model selector.
pub struct WorkersAi {
    client: reqwest::Client,
    api_base: String,
    account_id: String,
    api_token: String,
    embedding_model: String,
    dimensions: usize,
}

impl WorkersAi {
    /// Create a client with the default embedding model
    /// (`@cf/baai/bge-base-en-v1.5`, 768 dimensions).
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(RagError::Embedding {
                provider: "WorkersAI".into(),
                message: "API token must not be empty".into(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_base: API_BASE.into(),
            account_id: account_id.into(),
            api_token,
            embedding_model: "@cf/baai/bge-base-en-v1.5".into(),
            dimensions: BGE_BASE_DIMENSIONS,
        })
    }

    /// Override the embedding model and its dimensionality.
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.embedding_model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Point the client at a non-default API base (gateways, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn run_url(&self, model: &str) -> String {
        format!("{}/accounts/{}/ai/run/{model}", self.api_base, self.account_id)
    }

    /// `make_err` shapes failures into the caller's error variant, so
    /// generation failures surface as [`RagError::Generation`] and
    /// embedding failures as [`RagError::Embedding`].
    async fn run<Req, Res, F>(&self, model: &str, body: &Req, make_err: F) -> Result<Res>
    where
        Req: Serialize,
        Res: for<'de> Deserialize<'de>,
        F: Fn(String) -> RagError,
    {
        let response = self
            .client
            .post(self.run_url(model))
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(model, error = %e, "request failed");
                make_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(model, %status, "API error");
            return Err(make_err(format!("API returned {status}: {body}")));
        }

        let envelope: ApiEnvelope<Res> = response.json().await.map_err(|e| {
            error!(model, error = %e, "failed to parse response");
            make_err(format!("failed to parse response: {e}"))
        })?;

        if !envelope.success {
            return Err(make_err(first_error(&envelope.errors)));
        }
        envelope
            .result
            .ok_or_else(|| make_err("API reported success without a result".into()))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    text: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResult {
    data: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for WorkersAi {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: "WorkersAI".into(),
            message: "API returned no vectors".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            provider = "WorkersAI",
            batch_size = texts.len(),
            model = %self.embedding_model,
            "embedding batch"
        );
        let request = EmbeddingRequest { text: texts.to_vec() };
        let result: EmbeddingResult = self
            .run(&self.embedding_model, &request, |message| RagError::Embedding {
                provider: "WorkersAI".into(),
                message,
            })
            .await?;
        Ok(result.data)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResult {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl TextGenerator for WorkersAi {
    async fn generate(
        &self,
        model: &str,
        prompt: &ChatPrompt,
        params: GenerationParams,
    ) -> Result<String> {
        debug!(provider = "WorkersAI", model, temperature = params.temperature, "generating");
        let request = ChatRequest {
            messages: vec![
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let result: ChatResult = self
            .run(model, &request, |message| RagError::Generation {
                model: model.to_string(),
                message,
            })
            .await?;
        Ok(result.response)
    }
}

// ── Vectorize ──────────────────────────────────────────────────────

/// A [`VectorIndex`] backed by a Cloudflare Vectorize v2 index.
pub struct Vectorize {
    client: reqwest::Client,
    account_id: String,
    api_token: String,
    index_name: String,
}

impl Vectorize {
    /// Create a client for the named Vectorize index.
    pub fn new(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Result<Self> {
        let index_name = index_name.into();
        if index_name.is_empty() {
            return Err(RagError::Index {
                backend: "Vectorize".into(),
                message: "index name must not be empty".into(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            account_id: account_id.into(),
            api_token: api_token.into(),
            index_name,
        })
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{API_BASE}/accounts/{}/vectorize/v2/indexes/{}/{operation}",
            self.account_id, self.index_name
        )
    }

    fn index_error(&self, message: impl Into<String>) -> RagError {
        RagError::Index { backend: "Vectorize".into(), message: message.into() }
    }

    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(backend = "Vectorize", operation, %status, "API error");
            return Err(self.index_error(format!("API returned {status}: {body}")));
        }
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| self.index_error(format!("failed to parse response: {e}")))?;
        if !envelope.success {
            return Err(self.index_error(first_error(&envelope.errors)));
        }
        envelope
            .result
            .ok_or_else(|| self.index_error("API reported success without a result"))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    /// Metadata only; the stored vectors are not requested.
    return_metadata: &'static str,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    matches: Vec<VectorizeMatch>,
}

#[derive(Deserialize)]
struct VectorizeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, Value>>,
}

#[derive(Serialize)]
struct UpsertLine<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a HashMap<String, String>,
}

#[derive(Deserialize)]
struct UpsertResult {
    #[serde(rename = "mutationId", default)]
    mutation_id: String,
}

fn metadata_to_strings(metadata: Option<serde_json::Map<String, Value>>) -> HashMap<String, String> {
    metadata
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect()
}

#[async_trait]
impl VectorIndex for Vectorize {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        // Vectorize upsert takes NDJSON, one vector per line.
        let mut body = String::new();
        for entry in entries {
            let line = UpsertLine {
                id: &entry.id,
                values: &entry.vector,
                metadata: &entry.metadata,
            };
            let serialized = serde_json::to_string(&line)
                .map_err(|e| self.index_error(format!("failed to encode entry: {e}")))?;
            body.push_str(&serialized);
            body.push('\n');
        }

        let response = self
            .client
            .post(self.endpoint("upsert"))
            .bearer_auth(&self.api_token)
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| self.index_error(format!("request failed: {e}")))?;

        let result: UpsertResult = self.read_envelope("upsert", response).await?;
        debug!(
            backend = "Vectorize",
            count = entries.len(),
            mutation_id = %result.mutation_id,
            "upserted entries"
        );
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Match>> {
        let request = QueryRequest { vector, top_k, return_metadata: "all" };
        let response = self
            .client
            .post(self.endpoint("query"))
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.index_error(format!("request failed: {e}")))?;

        let result: QueryResult = self.read_envelope("query", response).await?;
        Ok(result
            .matches
            .into_iter()
            .map(|m| Match {
                id: m.id,
                score: m.score,
                metadata: metadata_to_strings(m.metadata),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on this port, so requests fail at connect time.
    fn unreachable_client() -> WorkersAi {
        WorkersAi::new("acct", "token").unwrap().with_api_base("http://127.0.0.1:9/client/v4")
    }

    #[tokio::test]
    async fn generation_failures_surface_as_generation_errors() {
        let client = unreachable_client();
        let prompt = ChatPrompt { system: "system".into(), user: "user".into() };
        let params = GenerationParams { temperature: 0.2, max_tokens: 16 };

        let err = client
            .generate("@cf/meta/llama-3.1-8b-instruct", &prompt, params)
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Generation { .. }));
        assert!(!err.to_string().contains("Embedding"));
    }

    #[tokio::test]
    async fn embedding_failures_surface_as_embedding_errors() {
        let client = unreachable_client();
        let err = client.embed("some text").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding { .. }));
    }
}

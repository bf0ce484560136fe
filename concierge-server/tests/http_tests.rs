//! HTTP contract tests against the router with deterministic fakes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use concierge_rag::{
    AnswerPipeline, ChatPrompt, EmbeddingProvider, GenerationParams, IndexEntry, Match,
    TextGenerator, VectorIndex,
};
use concierge_server::{AppState, app_router};

struct FixedEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> concierge_rag::Result<Vec<f32>> {
        Ok(vec![0.1; 8])
    }

    fn dimensions(&self) -> usize {
        8
    }
}

struct MiscountingEmbedder;

#[async_trait]
impl EmbeddingProvider for MiscountingEmbedder {
    async fn embed(&self, _text: &str) -> concierge_rag::Result<Vec<f32>> {
        Ok(vec![0.1; 8])
    }

    async fn embed_batch(&self, _texts: &[&str]) -> concierge_rag::Result<Vec<Vec<f32>>> {
        Ok(Vec::new())
    }

    fn dimensions(&self) -> usize {
        8
    }
}

struct ScriptedIndex {
    matches: Vec<Match>,
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn upsert(&self, _entries: &[IndexEntry]) -> concierge_rag::Result<()> {
        Ok(())
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> concierge_rag::Result<Vec<Match>> {
        Ok(self.matches.clone())
    }
}

struct FixedGenerator;

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(
        &self,
        _model: &str,
        _prompt: &ChatPrompt,
        _params: GenerationParams,
    ) -> concierge_rag::Result<String> {
        Ok("A grounded answer.".to_string())
    }
}

fn scored_match(id: &str, score: f32, text: &str) -> Match {
    let mut metadata = HashMap::new();
    metadata.insert("text".to_string(), text.to_string());
    Match { id: id.to_string(), score, metadata }
}

fn router_for(pipeline: AnswerPipeline) -> axum::Router {
    app_router(AppState { pipeline: Arc::new(pipeline) })
}

fn no_provider_router() -> axum::Router {
    router_for(AnswerPipeline::builder().build().unwrap())
}

fn full_router() -> axum::Router {
    let pipeline = AnswerPipeline::builder()
        .embedder(Arc::new(FixedEmbedder))
        .index(Arc::new(ScriptedIndex {
            matches: vec![scored_match("doc-1", 0.9, "service description")],
        }))
        .generator(Arc::new(FixedGenerator))
        .build()
        .unwrap();
    router_for(pipeline)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn non_post_method_is_rejected_with_405() {
    for uri in ["/chat", "/embed"] {
        let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
        let response = no_provider_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

#[tokio::test]
async fn empty_question_returns_400() {
    for body in ["{}", r#"{"query": "  "}"#, "not even json"] {
        let response = no_provider_router().oneshot(post_json("/chat", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn missing_provider_still_answers_200() {
    let response = no_provider_router()
        .oneshot(post_json("/chat", r#"{"query": "what do you offer?"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["mode"], "no-provider");
    assert_eq!(body["confidence"], 0.0);
    assert_eq!(body["modelUsed"], "none");
}

#[tokio::test]
async fn chat_answers_with_citations() {
    let response = full_router()
        .oneshot(post_json("/chat", r#"{"query": "what services do you offer?", "topK": 3}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["mode"], "rag");
    assert_eq!(body["confidenceLabel"], "high");
    let answer = body["answer"].as_str().unwrap();
    assert!(answer.contains("Sources: [1]"));
    assert_eq!(body["sources"][0]["id"], "doc-1");
}

#[tokio::test]
async fn embed_indexes_the_posted_batch() {
    let body = json!({
        "docs": [
            { "id": "a", "text": "first", "meta": { "title": "A" } },
            { "text": "second" }
        ]
    });
    let response =
        full_router().oneshot(post_json("/embed", &body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["indexed"], 2);
}

#[tokio::test]
async fn embed_without_docs_returns_400() {
    for body in ["{}", r#"{"docs": []}"#, ""] {
        let response = full_router().oneshot(post_json("/embed", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn embed_seed_flag_ingests_the_seed_corpus() {
    let response = full_router().oneshot(post_json("/embed?seed=1", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let expected = concierge_rag::seed::seed_documents().len();
    assert_eq!(body_json(response).await["indexed"], expected);
}

#[tokio::test]
async fn embed_without_provider_is_a_500() {
    let body = r#"{"docs": [{"text": "orphan"}]}"#;
    let response = no_provider_router().oneshot(post_json("/embed", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn embedding_count_mismatch_is_a_500() {
    let pipeline = AnswerPipeline::builder()
        .embedder(Arc::new(MiscountingEmbedder))
        .index(Arc::new(ScriptedIndex { matches: Vec::new() }))
        .build()
        .unwrap();
    let body = r#"{"docs": [{"text": "one"}, {"text": "two"}]}"#;
    let response = router_for(pipeline).oneshot(post_json("/embed", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.to_lowercase().contains("mismatch"));
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = no_provider_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

//! Integration tests for the chat service.
//!
//! These drive the axum router end to end with in-process embedding and
//! generation collaborators, so no model server is needed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use listing_assistant::api;
use listing_assistant::config::Config;
use listing_assistant::error::Result;
use listing_assistant::llm::{Embedder, Generator};
use listing_assistant::policy::PolicyEngine;
use listing_assistant::search::vector::{VectorIndex, VectorStore};
use listing_assistant::state::AppState;

const VOCAB: &[&str] = &["house", "flat", "plot", "dha", "gulberg", "bahria", "bed"];

struct VocabEmbedder;

#[async_trait]
impl Embedder for VocabEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                VOCAB
                    .iter()
                    .map(|w| lower.split_whitespace().filter(|x| x == w).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Replays canned completions and counts calls.
struct CannedGenerator {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl CannedGenerator {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().pop_front();
        Ok(next.unwrap_or_default())
    }
}

fn app_state(dir: &std::path::Path, generator: Arc<CannedGenerator>) -> AppState {
    let config = Config {
        data_dir: dir.to_path_buf(),
        ..Config::default()
    };
    let store = Arc::new(VectorStore::open_or_create(&config.vector_dir()).unwrap());
    AppState::from_parts(
        config,
        store,
        Arc::new(VocabEmbedder),
        generator,
        PolicyEngine::default(),
    )
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_text(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn sample_listings() -> Value {
    json!({
        "documents": [
            {"id": "l1", "text": "3 bed house for sale in DHA Phase 6", "metadata": {"location": "DHA", "type": "House", "beds": 3}},
            {"id": "l2", "text": "2 bed flat for rent in Gulberg", "metadata": {"location": "Gulberg", "type": "Flat", "beds": 2}},
            {"id": "l3", "text": "10 marla plot in Bahria Town", "metadata": {"location": "Bahria", "type": "Plot"}}
        ]
    })
}

#[tokio::test]
async fn test_ingest_then_chat_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(CannedGenerator::new(&[
        "house dha",
        "There is a 3 bed house for sale in DHA Phase 6.",
    ]));
    let state = app_state(dir.path(), generator.clone());
    let app = api::router(state.clone());

    let (status, body) = post_json(app.clone(), "/api/documents", sample_listings()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"added": 3, "skipped": 0, "total": 3}));

    let (status, body) = post_json(
        app.clone(),
        "/api/chat",
        json!({"messages": [{"role": "user", "content": "Any houses in DHA?"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({"response": "There is a 3 bed house for sale in DHA Phase 6.", "properties": []})
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

    let (status, text) = get_text(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("listing_assistant_chat_requests_total 1"));
    assert!(text.contains("listing_assistant_llm_requests_total 2"));
    assert!(text.contains("listing_assistant_llm_request_duration_seconds_count 2"));
    assert!(text.contains("listing_assistant_guardrail_violations_total{phase=\"input\"} 0"));
}

#[tokio::test]
async fn test_reingesting_skips_known_ids_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    {
        let app = api::router(app_state(dir.path(), Arc::new(CannedGenerator::new(&[]))));
        post_json(app.clone(), "/api/documents", sample_listings()).await;
        let (status, body) = post_json(app, "/api/documents", sample_listings()).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"added": 0, "skipped": 3, "total": 3}));
    }

    let store = VectorStore::open_or_create(&dir.path().join("vectors")).unwrap();
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_chat_pii_is_blocked_without_generation() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(CannedGenerator::new(&["unused"]));
    let app = api::router(app_state(dir.path(), generator.clone()));

    let (status, body) = post_json(
        app,
        "/api/chat",
        json!({"messages": [{"role": "user", "content": "Call me on 0300123456 about plots"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["response"], "Input Guardrail Violation: PII detected");
    assert_eq!(body["properties"], json!([]));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_chat_invalid_shapes_are_client_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = api::router(app_state(dir.path(), Arc::new(CannedGenerator::new(&[]))));

    let (status, _) = post_json(app.clone(), "/api/chat", json!({"messages": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        app.clone(),
        "/api/chat",
        json!({"messages": [{"role": "assistant", "content": "hello"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        app,
        "/chat",
        json!({"messages": [{"role": "system", "content": "x"}, {"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_document_batch_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = api::router(app_state(dir.path(), Arc::new(CannedGenerator::new(&[]))));
    let (status, _) = post_json(app, "/api/documents", json!({"documents": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_document_count() {
    let dir = tempfile::tempdir().unwrap();
    let app = api::router(app_state(dir.path(), Arc::new(CannedGenerator::new(&[]))));
    post_json(app.clone(), "/api/documents", sample_listings()).await;
    let (status, text) = get_text(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body, json!({"status": "ok", "documents": 3}));
}

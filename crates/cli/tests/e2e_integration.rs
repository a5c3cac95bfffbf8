//! End-to-end tests for IKMS.
//!
//! These drive the HTTP router over the real index, pipeline and session
//! store, with a deterministic provider standing in for the LLM and the
//! embedding model.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ikms_agent::LlmRole;
use ikms_core::error::ProviderError;
use ikms_core::message::{Message, MessageToolCall};
use ikms_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
};
use ikms_gateway::{SharedState, build_router, build_state};
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

const KEYWORDS: [&str; 6] = ["hnsw", "graph", "layered", "ivf", "cluster", "centroid"];

/// Embeds by keyword counts and answers each stage from what its prompt
/// actually contains, so grounding and history flow through for real.
struct KnowledgeProvider {
    offline: AtomicBool,
}

impl KnowledgeProvider {
    fn new() -> Self {
        Self {
            offline: AtomicBool::new(false),
        }
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

fn role_of(request: &ProviderRequest) -> LlmRole {
    let system = request.messages[0].content.as_str();
    [
        LlmRole::Retrieval,
        LlmRole::Drafting,
        LlmRole::Verification,
        LlmRole::Compaction,
        LlmRole::Titling,
    ]
    .into_iter()
    .find(|role| role.system_prompt() == system)
    .expect("unknown system prompt")
}

fn embed_text(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|k| lower.matches(k).count() as f32)
        .collect()
}

fn reply(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: None,
        model: "mock".into(),
    }
}

#[async_trait::async_trait]
impl Provider for KnowledgeProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Network("connection refused".into()));
        }

        let user = request.messages[1].content.clone();
        Ok(match role_of(&request) {
            LlmRole::Retrieval => {
                let question = user
                    .lines()
                    .find_map(|l| l.strip_prefix("Current question: "))
                    .unwrap_or_default();
                let mut response = reply("");
                response.message.tool_calls = vec![MessageToolCall {
                    id: "call_1".into(),
                    name: "retrieve_documents".into(),
                    arguments: serde_json::json!({"query": question}).to_string(),
                }];
                response
            }
            LlmRole::Drafting => reply(
                &serde_json::json!({
                    "answer": "draft",
                    "used_history": user.contains("User: "),
                })
                .to_string(),
            ),
            LlmRole::Verification => {
                if user.contains("layered graph") {
                    reply("HNSW builds a layered graph.")
                } else {
                    reply("I don't know.")
                }
            }
            LlmRole::Compaction => reply("The user is learning about HNSW."),
            LlmRole::Titling => reply("\"HNSW Overview\""),
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| embed_text(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    _dir: tempfile::TempDir,
    provider: Arc<KnowledgeProvider>,
    state: SharedState,
    app: Router,
}

impl Harness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ikms_config::AppConfig::default();
        config.gateway.upload_dir = dir.path().join("uploads").display().to_string();
        config.retrieval.min_score = 0.1;

        let provider = Arc::new(KnowledgeProvider::new());
        let state = build_state(&config, provider.clone());
        ikms_gateway::reset_storage(&state).await.unwrap();
        let app = build_router(state.clone(), &config.gateway);

        Self {
            _dir: dir,
            provider,
            state,
            app,
        }
    }

    /// Stand in for an upload: a stored file plus its indexed text.
    async fn add_document(&self, filename: &str, text: &str) -> usize {
        let path = self.state.upload_dir.join(filename);
        std::fs::write(&path, text).unwrap();
        self.state
            .index
            .index_text(&path.display().to_string(), text)
            .await
            .unwrap()
    }

    async fn ask(&self, question: &str, session_id: Option<&str>) -> (StatusCode, serde_json::Value) {
        let body = serde_json::json!({"question": question, "session_id": session_id});
        let request = Request::builder()
            .method("POST")
            .uri("/qa/conversation")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn send_empty(&self, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

const HNSW_DOC: &str = "HNSW builds a layered graph over the vectors. Search descends the graph layer by layer.";
const IVF_DOC: &str = "IVF assigns every vector to a cluster centroid and scans only the nearest cluster.";

// ── E2E ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_answer_is_grounded_in_matching_document() {
    let harness = Harness::new().await;
    harness.add_document("hnsw.txt", HNSW_DOC).await;
    harness.add_document("ivf.txt", IVF_DOC).await;

    let (status, reply) = harness.ask("What is HNSW?", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["answer"], "HNSW builds a layered graph.");
    assert_eq!(reply["session_title"], "HNSW Overview");
    assert_eq!(reply["used_history"], false);

    let context = reply["history"][0]["context_used"].as_str().unwrap();
    assert!(context.contains("hnsw.txt"));
    assert!(!context.contains("ivf.txt"), "unrelated document leaked into context");
}

#[tokio::test]
async fn e2e_follow_ups_use_history_and_compact() {
    let harness = Harness::new().await;
    harness.add_document("hnsw.txt", HNSW_DOC).await;

    let (_, first) = harness.ask("What is HNSW?", None).await;
    let id = first["session_id"].as_str().unwrap().to_string();
    assert!(first.get("conversation_summary").is_none());

    let (_, second) = harness.ask("How is its graph searched?", Some(&id)).await;
    assert_eq!(second["session_id"], id.as_str());
    assert_eq!(second["used_history"], true);
    assert!(second.get("conversation_summary").is_none());

    let (_, third) = harness.ask("Is the graph layered?", Some(&id)).await;
    assert_eq!(third["conversation_summary"], "The user is learning about HNSW.");
    assert_eq!(third["session_title"], "HNSW Overview");

    let indexes: Vec<u64> = third["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indexes, vec![1, 2, 3]);

    let (status, history) = harness
        .send_empty("GET", &format!("/qa/session/{id}/history"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["history"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn e2e_deleted_document_no_longer_grounds_answers() {
    let harness = Harness::new().await;
    let indexed = harness.add_document("hnsw.txt", HNSW_DOC).await;

    let (_, before) = harness.ask("What is HNSW?", None).await;
    assert_eq!(before["answer"], "HNSW builds a layered graph.");

    let (status, deleted) = harness.send_empty("DELETE", "/documents/hnsw.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["chunks_deleted"], indexed);

    let (_, documents) = harness.send_empty("GET", "/documents").await;
    assert_eq!(documents["documents"], serde_json::json!([]));

    let (_, after) = harness.ask("What is HNSW?", None).await;
    assert_eq!(after["answer"], "I don't know.");
    assert_eq!(after["history"][0]["context_used"], "");
}

#[tokio::test]
async fn e2e_sessions_are_isolated() {
    let harness = Harness::new().await;
    harness.add_document("hnsw.txt", HNSW_DOC).await;

    let (_, a) = harness.ask("What is HNSW?", None).await;
    let (_, b) = harness.ask("What is HNSW?", None).await;
    assert_ne!(a["session_id"], b["session_id"]);

    let a_id = a["session_id"].as_str().unwrap();
    let (_, a2) = harness.ask("Tell me more about the graph", Some(a_id)).await;
    assert_eq!(a2["history"].as_array().unwrap().len(), 2);

    let (_, sessions) = harness.send_empty("GET", "/qa/sessions").await;
    let sessions = sessions["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    // Most recently active first.
    assert_eq!(sessions[0]["id"], a_id);
    assert_eq!(sessions[0]["turn_count"], 2);
    assert_eq!(sessions[1]["turn_count"], 1);
}

#[tokio::test]
async fn e2e_provider_outage_records_nothing() {
    let harness = Harness::new().await;
    harness.add_document("hnsw.txt", HNSW_DOC).await;

    let (_, first) = harness.ask("What is HNSW?", None).await;
    let id = first["session_id"].as_str().unwrap().to_string();

    harness.provider.set_offline(true);
    let (status, body) = harness.ask("And then?", Some(&id)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal server error");

    let (status, body) = harness.ask("Brand new question", Some("fresh-session")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal server error");

    harness.provider.set_offline(false);
    let (_, history) = harness
        .send_empty("GET", &format!("/qa/session/{id}/history"))
        .await;
    assert_eq!(history["history"].as_array().unwrap().len(), 1);

    let (status, _) = harness
        .send_empty("GET", "/qa/session/fresh-session/history")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn e2e_concurrent_questions_keep_turn_order() {
    let harness = Arc::new(Harness::new().await);
    harness.add_document("hnsw.txt", HNSW_DOC).await;

    let (_, first) = harness.ask("What is HNSW?", None).await;
    let id = first["session_id"].as_str().unwrap().to_string();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let harness = harness.clone();
            let id = id.clone();
            tokio::spawn(async move { harness.ask(&format!("graph question {i}"), Some(&id)).await })
        })
        .collect();
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let (_, history) = harness
        .send_empty("GET", &format!("/qa/session/{id}/history"))
        .await;
    let indexes: Vec<u64> = history["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indexes, (1..=6).collect::<Vec<u64>>());
}

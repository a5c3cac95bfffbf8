//! Shared test doubles for the pipeline and conversation tests.

use std::sync::Mutex;

use async_trait::async_trait;
use ikms_core::error::{ProviderError, RetrievalError};
use ikms_core::message::{Message, MessageToolCall};
use ikms_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use ikms_core::{Passage, SemanticSearch};

use crate::invoke::LlmRole;

/// Returns scripted responses in order and records every request.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();
        assert!(
            call < responses.len(),
            "ScriptedProvider: no more responses (call #{call}, have {})",
            responses.len()
        );
        requests.push(request);
        Ok(responses[call].clone())
    }
}

/// Always fails with a network error.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Answers by role, so call order does not matter. Used where requests
/// interleave.
pub struct RoleAwareProvider {
    title: String,
    fail_on: Option<LlmRole>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RoleAwareProvider {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.into(),
            fail_on: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, role: LlmRole) -> Self {
        self.fail_on = Some(role);
        self
    }

    pub fn calls_for(&self, role: LlmRole) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| role_of(r) == Some(role))
            .count()
    }

    pub fn requests_for(&self, role: LlmRole) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| role_of(r) == Some(role))
            .cloned()
            .collect()
    }
}

fn role_of(request: &ProviderRequest) -> Option<LlmRole> {
    let system = &request.messages.first()?.content;
    [
        LlmRole::Retrieval,
        LlmRole::Drafting,
        LlmRole::Verification,
        LlmRole::Compaction,
        LlmRole::Titling,
    ]
    .into_iter()
    .find(|role| role.system_prompt() == system)
}

#[async_trait]
impl Provider for RoleAwareProvider {
    fn name(&self) -> &str {
        "role_aware_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let role = role_of(&request).expect("request without a known system prompt");
        self.requests.lock().unwrap().push(request);

        // Let concurrent requests interleave between stages.
        tokio::task::yield_now().await;

        if self.fail_on == Some(role) {
            return Err(ProviderError::Network(format!("{} unavailable", role.as_str())));
        }

        Ok(match role {
            LlmRole::Retrieval => tool_call_response(vec![tool_call(
                "retrieve_documents",
                serde_json::json!({"query": "rewritten query"}),
            )]),
            LlmRole::Drafting => text_response(&draft_json("draft answer", true)),
            LlmRole::Verification => text_response("verified answer"),
            LlmRole::Compaction => text_response("running summary"),
            LlmRole::Titling => text_response(&self.title),
        })
    }
}

/// Returns fixed passages and records the queries it was asked.
pub struct StaticSearch {
    passages: Vec<Passage>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SemanticSearch for StaticSearch {
    async fn search(&self, query: &str) -> Result<Vec<Passage>, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.passages.clone())
    }
}

pub struct FailingSearch;

#[async_trait]
impl SemanticSearch for FailingSearch {
    async fn search(&self, _query: &str) -> Result<Vec<Passage>, RetrievalError> {
        Err(RetrievalError::Unavailable("index offline".into()))
    }
}

pub fn passage(source: &str, chunk_index: usize, content: &str) -> Passage {
    Passage {
        id: format!("{source}#{chunk_index}"),
        source: source.into(),
        chunk_index,
        content: content.into(),
        score: 0.9,
    }
}

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut response = text_response("");
    response.message.tool_calls = tool_calls;
    response
}

pub fn tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

pub fn draft_json(answer: &str, used_history: bool) -> String {
    serde_json::json!({"answer": answer, "used_history": used_history}).to_string()
}

//! Conversation service: the pipeline plus session memory.

use std::sync::Arc;

use ikms_core::{Provider, SemanticSearch, Session, SessionId, SessionSummary, Turn};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::invoke::LlmInvoker;
use crate::pipeline::{MemoryCompactor, Pipeline, PipelineError, PipelineState, TitleGenerator};
use crate::session_store::{SessionStore, TurnRecord};

/// Result of one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationReply {
    pub answer: String,
    pub session_id: SessionId,
    pub session_title: String,
    /// The full history including this turn.
    pub history: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_summary: Option<String>,
    pub used_history: bool,
}

pub struct ConversationService {
    pipeline: Pipeline,
    titles: TitleGenerator,
    store: SessionStore,
}

impl ConversationService {
    pub fn new(llm: Arc<LlmInvoker>, search: Arc<dyn SemanticSearch>, store: SessionStore) -> Self {
        Self {
            pipeline: Pipeline::new(llm, search),
            titles: TitleGenerator::default(),
            store,
        }
    }

    /// Wire the service from configuration.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        search: Arc<dyn SemanticSearch>,
        config: &ikms_config::AppConfig,
    ) -> Self {
        let llm = Arc::new(LlmInvoker::from_config(provider, config));
        let store = SessionStore::with_capacity(config.sessions.max_sessions);
        Self {
            pipeline: Pipeline::new(llm, search)
                .with_compactor(MemoryCompactor::new(config.sessions.compaction_threshold)),
            titles: TitleGenerator::new(config.sessions.title_max_chars),
            store,
        }
    }

    pub fn with_compactor(mut self, compactor: MemoryCompactor) -> Self {
        self.pipeline = self.pipeline.with_compactor(compactor);
        self
    }

    /// Answer `question` within a session, creating the session when the
    /// id is absent or unknown.
    ///
    /// The session stays locked for the whole run. Nothing is recorded
    /// unless every pipeline stage succeeds.
    pub async fn ask(
        &self,
        question: &str,
        session_id: Option<SessionId>,
    ) -> Result<ConversationReply, PipelineError> {
        let session_id = session_id.unwrap_or_default();
        let mut guard = self.store.lock(session_id.clone()).await;

        let state = PipelineState::new(
            Some(session_id),
            question,
            guard.history().to_vec(),
            guard.summary().map(str::to_string),
        );
        let outcome = self.pipeline.run(state).await?;

        let title = if guard.is_new() {
            Some(
                self.titles
                    .generate(self.pipeline.llm(), question, &outcome.answer)
                    .await,
            )
        } else {
            None
        };

        let session = guard.commit(
            TurnRecord {
                question: question.to_string(),
                answer: outcome.answer.clone(),
                context_used: outcome.context,
                used_history: outcome.used_history,
            },
            title,
            outcome.conversation_summary,
        );
        drop(guard);

        info!(
            session_id = %session.id,
            turns = session.turns.len(),
            used_history = outcome.used_history,
            "Answered question"
        );

        Ok(ConversationReply {
            answer: outcome.answer,
            session_title: session.display_title().to_string(),
            session_id: session.id,
            history: session.turns,
            conversation_summary: session.summary,
            used_history: outcome.used_history,
        })
    }

    pub async fn session(&self, id: &SessionId) -> Option<Session> {
        self.store.get(id).await
    }

    pub async fn sessions(&self) -> Vec<SessionSummary> {
        self.store.list().await
    }

    /// `false` when no such session exists.
    pub async fn delete_session(&self, id: &SessionId) -> bool {
        self.store.delete(id).await
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

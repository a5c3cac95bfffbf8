//! Per-request pipeline state.

use ikms_core::{SessionId, Turn};

/// Everything one question accumulates on its way through the pipeline.
///
/// Owned by a single request and dropped when the orchestrator returns.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub session_id: SessionId,
    pub question: String,
    /// Set by retrieval; may be empty when nothing was retrieved.
    pub context: Option<String>,
    pub draft_answer: Option<String>,
    pub used_history: bool,
    /// Set by verification.
    pub answer: Option<String>,
    /// Turns completed before this question, in ordinal order.
    pub history: Vec<Turn>,
    pub conversation_summary: Option<String>,
}

impl PipelineState {
    /// Start a run. A missing session id gets a fresh one.
    pub fn new(
        session_id: Option<SessionId>,
        question: impl Into<String>,
        history: Vec<Turn>,
        conversation_summary: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.unwrap_or_default(),
            question: question.into(),
            context: None,
            draft_answer: None,
            used_history: false,
            answer: None,
            history,
            conversation_summary,
        }
    }
}

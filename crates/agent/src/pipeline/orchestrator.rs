//! Pipeline orchestrator.
//!
//! `Start → Retrieval → Drafting → Verification → Compaction? → Done`.
//! Stages run strictly in order; only compaction may be skipped, and a
//! failing stage aborts the run with the stage attached to the error.

use std::fmt;
use std::sync::Arc;

use ikms_core::{SemanticSearch, SessionId};
use tracing::{error, info};

use super::compaction::MemoryCompactor;
use super::state::PipelineState;
use super::{drafting, retrieval, verification};
use crate::history::format_history;
use crate::invoke::LlmInvoker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Retrieval,
    Drafting,
    Verification,
    Compaction,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Retrieval => "retrieval",
            Self::Drafting => "drafting",
            Self::Verification => "verification",
            Self::Compaction => "compaction",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: ikms_core::Error,
}

/// Terminal output of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub session_id: SessionId,
    pub answer: String,
    pub used_history: bool,
    pub context: String,
    /// The summary after this run: refreshed by compaction, or carried over.
    pub conversation_summary: Option<String>,
    pub compacted: bool,
}

pub struct Pipeline {
    llm: Arc<LlmInvoker>,
    search: Arc<dyn SemanticSearch>,
    compactor: MemoryCompactor,
}

impl Pipeline {
    pub fn new(llm: Arc<LlmInvoker>, search: Arc<dyn SemanticSearch>) -> Self {
        Self {
            llm,
            search,
            compactor: MemoryCompactor::default(),
        }
    }

    pub fn with_compactor(mut self, compactor: MemoryCompactor) -> Self {
        self.compactor = compactor;
        self
    }

    pub fn llm(&self) -> &LlmInvoker {
        &self.llm
    }

    pub async fn run(&self, mut state: PipelineState) -> Result<PipelineOutcome, PipelineError> {
        let session_id = state.session_id.clone();
        let formatted_history = format_history(&state.history);

        info!(session_id = %session_id, stage = %PipelineStage::Retrieval, prior_turns = state.history.len(), "Pipeline stage");
        let context = retrieval::retrieve(&self.llm, self.search.as_ref(), &state.question, &formatted_history)
            .await
            .map_err(|e| self.fail(&session_id, PipelineStage::Retrieval, e))?;
        state.context = Some(context);

        info!(session_id = %session_id, stage = %PipelineStage::Drafting, "Pipeline stage");
        let draft = drafting::draft(
            &self.llm,
            &state.question,
            state.context.as_deref(),
            &formatted_history,
            &state.history,
        )
        .await
        .map_err(|e| self.fail(&session_id, PipelineStage::Drafting, e))?;
        state.used_history = draft.used_history;
        state.draft_answer = Some(draft.answer);

        info!(session_id = %session_id, stage = %PipelineStage::Verification, "Pipeline stage");
        let answer = verification::verify(
            &self.llm,
            &state.question,
            state.context.as_deref().unwrap_or_default(),
            state.draft_answer.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| self.fail(&session_id, PipelineStage::Verification, e))?;
        state.answer = Some(answer);

        let compacted = self.compactor.should_compact(state.history.len());
        if compacted {
            info!(session_id = %session_id, stage = %PipelineStage::Compaction, "Pipeline stage");
            if let Some(summary) = self
                .compactor
                .compact(&self.llm, &state.history)
                .await
                .map_err(|e| self.fail(&session_id, PipelineStage::Compaction, e))?
            {
                state.conversation_summary = Some(summary);
            }
        }

        info!(session_id = %session_id, used_history = state.used_history, compacted, "Pipeline complete");

        Ok(PipelineOutcome {
            session_id,
            answer: state.answer.unwrap_or_default(),
            used_history: state.used_history,
            context: state.context.unwrap_or_default(),
            conversation_summary: state.conversation_summary,
            compacted,
        })
    }

    fn fail(&self, session_id: &SessionId, stage: PipelineStage, source: ikms_core::Error) -> PipelineError {
        error!(session_id = %session_id, stage = %stage, error = %source, "Pipeline stage failed");
        PipelineError { stage, source }
    }
}

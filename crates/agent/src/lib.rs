//! The question-answering pipeline and conversational memory.
//!
//! Every question runs through a fixed sequence of stages:
//!
//! 1. **Retrieval**: the model may rewrite the question using the history
//!    and calls `retrieve_documents`; the passages become the context
//! 2. **Drafting**: a structured answer `{answer, used_history}`
//! 3. **Verification**: the draft is checked against the context
//! 4. **Compaction**: once enough turns exist, the history is summarised
//!
//! [`ConversationService`] wraps the pipeline with the [`SessionStore`]: it
//! holds the session's lock for the whole request, generates the title on
//! the first turn and records the turn only after every stage succeeded.

pub mod conversation;
pub mod history;
pub mod invoke;
pub mod pipeline;
pub mod prompts;
pub mod session_store;

pub use conversation::{ConversationReply, ConversationService};
pub use history::{format_history, NO_HISTORY};
pub use invoke::{LlmInvoker, LlmRole};
pub use pipeline::{
    MemoryCompactor, Pipeline, PipelineError, PipelineOutcome, PipelineStage, PipelineState,
    TitleGenerator,
};
pub use session_store::{SessionGuard, SessionStore, TurnRecord};

#[cfg(test)]
pub(crate) mod test_helpers;

//! Pipeline stages and their orchestrator.
//!
//! Each stage is a plain async function (or a small policy struct) over
//! [`LlmInvoker`](crate::LlmInvoker); the orchestrator composes them in a
//! fixed order over one [`PipelineState`].

pub mod compaction;
pub mod drafting;
pub mod orchestrator;
pub mod retrieval;
pub mod state;
pub mod title;
pub mod verification;

pub use compaction::MemoryCompactor;
pub use drafting::DraftOutput;
pub use orchestrator::{Pipeline, PipelineError, PipelineOutcome, PipelineStage};
pub use state::PipelineState;
pub use title::TitleGenerator;

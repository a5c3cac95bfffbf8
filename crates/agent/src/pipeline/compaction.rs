//! Memory compaction: refresh the running summary once history grows.

use ikms_core::{Result, Turn};
use tracing::info;

use crate::history::format_history;
use crate::invoke::{LlmInvoker, LlmRole};

#[derive(Debug, Clone, Copy)]
pub struct MemoryCompactor {
    /// Minimum number of prior turns before a summary is produced.
    threshold: usize,
}

impl MemoryCompactor {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether a history of `prior_turns` turns gets summarised.
    pub fn should_compact(&self, prior_turns: usize) -> bool {
        prior_turns >= self.threshold
    }

    /// Summarise `history` (turns before the current question).
    ///
    /// `None` means the policy did not fire and the existing summary stands.
    pub async fn compact(&self, llm: &LlmInvoker, history: &[Turn]) -> Result<Option<String>> {
        if !self.should_compact(history.len()) {
            return Ok(None);
        }

        let prompt = format!(
            "Summarise this conversation history:\n\n{}",
            format_history(history)
        );
        let summary = llm.text(LlmRole::Compaction, &prompt).await?;
        info!(turns = history.len(), chars = summary.len(), "Compacted conversation history");
        Ok(Some(summary))
    }
}

impl Default for MemoryCompactor {
    fn default() -> Self {
        Self::new(2)
    }
}

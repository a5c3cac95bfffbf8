//! Verification stage: check the draft against the retrieved context.

use ikms_core::Result;
use tracing::debug;

use crate::invoke::{LlmInvoker, LlmRole};

/// Return the corrected answer. Runs even when the context is empty.
pub async fn verify(llm: &LlmInvoker, question: &str, context: &str, draft: &str) -> Result<String> {
    let prompt = format!(
        "Question: {question}\n\n\
         Context:\n{context}\n\n\
         Draft answer:\n{draft}\n\n\
         Verify the draft against the context and return the corrected answer."
    );

    let answer = llm.text(LlmRole::Verification, &prompt).await?;
    debug!(draft_chars = draft.len(), answer_chars = answer.len(), "Verified answer");
    Ok(answer)
}

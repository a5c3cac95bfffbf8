//! Drafting stage: a structured first answer.

use ikms_core::provider::ResponseFormat;
use ikms_core::{Result, Turn};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::invoke::{LlmInvoker, LlmRole};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftOutput {
    pub answer: String,
    pub used_history: bool,
}

fn draft_format() -> ResponseFormat {
    ResponseFormat {
        name: "draft_answer".into(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "answer": {"type": "string"},
                "used_history": {"type": "boolean"}
            },
            "required": ["answer", "used_history"],
            "additionalProperties": false
        }),
        strict: true,
    }
}

/// Produce the draft answer and the history-used flag.
///
/// The flag is forced to `false` when there is no prior turn, whatever the
/// model claims.
pub async fn draft(
    llm: &LlmInvoker,
    question: &str,
    context: Option<&str>,
    formatted_history: &str,
    history: &[Turn],
) -> Result<DraftOutput> {
    let context = context.unwrap_or_default();
    let prompt = format!(
        "Conversation history:\n{formatted_history}\n\n\
         Current question: {question}\n\n\
         Retrieved context:\n{context}"
    );

    let mut output: DraftOutput = llm.structured(LlmRole::Drafting, &prompt, draft_format()).await?;
    if history.is_empty() {
        output.used_history = false;
    }

    debug!(chars = output.answer.len(), used_history = output.used_history, "Drafted answer");
    Ok(output)
}

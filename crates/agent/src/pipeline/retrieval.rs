//! Retrieval stage: history-aware query rewriting plus semantic search.

use ikms_core::provider::ToolDefinition;
use ikms_core::{Passage, Result, SemanticSearch};
use tracing::{debug, info};

use crate::invoke::{LlmInvoker, LlmRole};

pub const RETRIEVE_TOOL: &str = "retrieve_documents";

pub fn retrieve_tool() -> ToolDefinition {
    ToolDefinition {
        name: RETRIEVE_TOOL.into(),
        description: "Search the indexed documents and return the most relevant passages."
            .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A self-contained search query"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

/// Ask the model for a search query and run it.
///
/// Returns the rendered passages, or an empty string when the model did
/// not call the tool.
pub async fn retrieve(
    llm: &LlmInvoker,
    search: &dyn SemanticSearch,
    question: &str,
    history: &str,
) -> Result<String> {
    let prompt = format!("Current question: {question}\n\nConversation history:\n{history}");

    let Some(call) = llm.tool_call(LlmRole::Retrieval, &prompt, retrieve_tool()).await? else {
        info!("Model did not request retrieval");
        return Ok(String::new());
    };

    let query = call
        .parsed_arguments()
        .ok()
        .and_then(|args| args.get("query")?.as_str().map(str::to_string))
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| question.to_string());

    debug!(query = %query, "Running semantic search");
    let passages = search.search(&query).await?;
    info!(passages = passages.len(), "Retrieved passages");

    Ok(render_passages(&passages))
}

/// `[n] (source: …, chunk …)` headers over each passage, blank-line separated.
pub fn render_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "[{}] (source: {}, chunk {})\n{}",
                i + 1,
                p.source,
                p.chunk_index,
                p.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

//! The single generation primitive used by every pipeline stage.
//!
//! Stages differ only in the system prompt ([`LlmRole`]) and in what they
//! expect back: free text, a JSON document matching a schema, or a tool call.

use std::sync::Arc;

use ikms_core::message::{Message, MessageToolCall};
use ikms_core::provider::{Provider, ProviderRequest, ResponseFormat, ToolDefinition};
use ikms_core::{Error, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::prompts;

/// Which system prompt a generation call runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    Retrieval,
    Drafting,
    Verification,
    Compaction,
    Titling,
}

impl LlmRole {
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Retrieval => prompts::RETRIEVAL,
            Self::Drafting => prompts::DRAFTING,
            Self::Verification => prompts::VERIFICATION,
            Self::Compaction => prompts::COMPACTION,
            Self::Titling => prompts::TITLING,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::Drafting => "drafting",
            Self::Verification => "verification",
            Self::Compaction => "compaction",
            Self::Titling => "titling",
        }
    }
}

/// A provider bound to a model and sampling settings.
pub struct LlmInvoker {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmInvoker {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &ikms_config::AppConfig) -> Self {
        Self::new(provider, config.default_model.clone())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, role: LlmRole, user: &str) -> ProviderRequest {
        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(role.system_prompt()), Message::user(user)],
        );
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }

    /// Plain text completion. The reply is trimmed.
    pub async fn text(&self, role: LlmRole, user: &str) -> Result<String> {
        let response = self.provider.complete(self.request(role, user)).await?;
        debug!(role = role.as_str(), chars = response.message.content.len(), "Text completion");
        Ok(response.message.content.trim().to_string())
    }

    /// Completion constrained to `format`, deserialized into `T`.
    ///
    /// An empty or non-conforming reply is [`Error::MalformedOutput`].
    pub async fn structured<T: DeserializeOwned>(
        &self,
        role: LlmRole,
        user: &str,
        format: ResponseFormat,
    ) -> Result<T> {
        let mut request = self.request(role, user);
        let schema_name = format.name.clone();
        request.response_format = Some(format);

        let response = self.provider.complete(request).await?;
        let body = strip_code_fence(&response.message.content);
        if body.is_empty() {
            return Err(Error::MalformedOutput(format!("empty `{schema_name}` response")));
        }

        serde_json::from_str(body)
            .map_err(|e| Error::MalformedOutput(format!("`{schema_name}`: {e}")))
    }

    /// Offer a single tool and return the call the model made, if any.
    pub async fn tool_call(
        &self,
        role: LlmRole,
        user: &str,
        tool: ToolDefinition,
    ) -> Result<Option<MessageToolCall>> {
        let mut request = self.request(role, user);
        let tool_name = tool.name.clone();
        request.tools = vec![tool];

        let response = self.provider.complete(request).await?;
        let call = response
            .message
            .tool_calls
            .into_iter()
            .find(|c| c.name == tool_name);
        debug!(role = role.as_str(), tool = %tool_name, called = call.is_some(), "Tool completion");
        Ok(call)
    }
}

/// Some models wrap JSON in a Markdown fence even in structured mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

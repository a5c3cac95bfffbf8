//! Session title generation. Never fails: any problem yields the
//! placeholder title.

use ikms_core::DEFAULT_SESSION_TITLE;
use tracing::{debug, warn};

use crate::invoke::{LlmInvoker, LlmRole};

const QUOTES: &[char] = &['"', '\'', '`', '“', '”', '‘', '’'];

#[derive(Debug, Clone, Copy)]
pub struct TitleGenerator {
    max_chars: usize,
}

impl TitleGenerator {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Title for a session from its first question and answer.
    pub async fn generate(&self, llm: &LlmInvoker, question: &str, answer: &str) -> String {
        let prompt = format!("Question: {question}\n\nAnswer: {answer}");

        match llm.text(LlmRole::Titling, &prompt).await {
            Ok(raw) => match self.sanitize(&raw) {
                Some(title) => {
                    debug!(title = %title, "Generated session title");
                    title
                }
                None => {
                    warn!(chars = raw.chars().count(), "Generated title rejected, using placeholder");
                    DEFAULT_SESSION_TITLE.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Title generation failed, using placeholder");
                DEFAULT_SESSION_TITLE.to_string()
            }
        }
    }

    /// Trim whitespace and surrounding quotes; reject empty or over-long titles.
    pub fn sanitize(&self, raw: &str) -> Option<String> {
        let title = raw.trim().trim_matches(QUOTES).trim();
        let len = title.chars().count();
        (len > 0 && len <= self.max_chars).then(|| title.to_string())
    }
}

impl Default for TitleGenerator {
    fn default() -> Self {
        Self::new(50)
    }
}

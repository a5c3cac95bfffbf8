//! Session and Turn domain types.
//!
//! A session is a conversation thread: an ordered, append-only list of
//! question/answer turns plus a display title and an optional rolling
//! summary. The mutation methods here enforce the per-session invariants;
//! the concurrency discipline lives in the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title shown for a session until (or instead of) a generated one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One question/answer exchange. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based ordinal within the session
    pub index: u32,

    pub question: String,

    pub answer: String,

    /// Retrieved context the answer was grounded in (may be empty)
    #[serde(default)]
    pub context_used: String,

    /// Whether the answer relied on earlier turns
    #[serde(default)]
    pub used_history: bool,

    pub created_at: DateTime<Utc>,
}

/// A conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Generated title; `None` until the first turn completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Ordered turns, ordinals `1..=n`
    pub turns: Vec<Turn>,

    /// Rolling conversation summary; absent until compaction first runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Last activity (bumped on every new turn)
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session. Callers append the first turn before the
    /// session becomes visible to anyone else.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: None,
            turns: Vec::new(),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The title to display, falling back to the placeholder.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_SESSION_TITLE)
    }

    /// Append a turn with the next ordinal and bump the activity timestamp.
    pub fn push_turn(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
        context_used: impl Into<String>,
        used_history: bool,
    ) -> &Turn {
        let now = Utc::now();
        let index = self.turns.len() as u32 + 1;
        self.turns.push(Turn {
            index,
            question: question.into(),
            answer: answer.into(),
            context_used: context_used.into(),
            used_history,
            created_at: now,
        });
        self.updated_at = now;
        &self.turns[self.turns.len() - 1]
    }

    /// Set the title if none has been assigned yet.
    ///
    /// Returns `true` when the title was set by this call.
    pub fn assign_title(&mut self, title: impl Into<String>) -> bool {
        if self.title.is_some() {
            return false;
        }
        self.title = Some(title.into());
        true
    }

    /// Replace the summary when a new one was produced; `None` keeps the
    /// existing summary.
    pub fn replace_summary(&mut self, summary: Option<String>) {
        if let Some(summary) = summary {
            self.summary = Some(summary);
        }
    }

    pub fn summary_view(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.display_title().to_string(),
            turn_count: self.turns.len(),
            has_summary: self.summary.is_some(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Lightweight listing entry for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub turn_count: usize,
    pub has_summary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

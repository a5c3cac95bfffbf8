//! # IKMS Core
//!
//! Domain types, traits, and error definitions for the IKMS conversational
//! retrieval-augmented question answering service. It depends only on
//! serialization, error and id/time crates (no async runtime, no HTTP
//! client, no web framework): it defines the domain model that every
//! other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (text generation, semantic search) is a trait
//! here. Implementations live in their respective crates, which keeps the
//! pipeline testable with scripted stubs and keeps all crates depending
//! inward on core.

pub mod error;
pub mod message;
pub mod provider;
pub mod search;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, ToolDefinition};
pub use search::{Passage, SemanticSearch};
pub use session::{Session, SessionId, SessionSummary, Turn, DEFAULT_SESSION_TITLE};

//! Semantic search trait: the retrieval step's view of the vector index.
//!
//! The index itself is an opaque nearest-neighbour service: the pipeline
//! only needs ranked passages with the identifier of the document they came
//! from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Unique chunk ID
    pub id: String,

    /// Source identifier (the document's storage path)
    pub source: String,

    /// Position of the chunk within its document
    pub chunk_index: usize,

    /// The chunk text
    pub content: String,

    /// Similarity score (set by the search)
    #[serde(default)]
    pub score: f32,
}

/// The semantic search collaborator.
///
/// Implementations: the in-memory vector index in `ikms-retrieval`, scripted
/// stubs in tests.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    /// Return passages ranked by relevance to `query`, best first.
    async fn search(&self, query: &str) -> std::result::Result<Vec<Passage>, RetrievalError>;
}

//! Retrieval layer for IKMS.
//!
//! Turns uploaded documents into embedded chunks and answers semantic
//! queries over them. The index is an in-process brute-force cosine
//! ranker; swap in anything implementing `ikms_core::SemanticSearch`.

pub mod index;
pub mod splitter;
pub mod vector;

pub use index::VectorIndex;
pub use splitter::TextSplitter;
pub use vector::{cosine_similarity, vector_search, IndexedChunk};

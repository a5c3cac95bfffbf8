//! In-memory vector index with PDF ingestion.
//!
//! Documents are split into chunks, embedded through the configured
//! provider, and kept in a `Vec` behind a `tokio::sync::RwLock`. Search
//! embeds the query and ranks every stored chunk by cosine similarity.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ikms_core::error::{IngestError, ProviderError, RetrievalError};
use ikms_core::provider::{EmbeddingRequest, Provider};
use ikms_core::{Passage, SemanticSearch};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::splitter::TextSplitter;
use crate::vector::{vector_search, IndexedChunk};

pub struct VectorIndex {
    provider: Arc<dyn Provider>,
    embedding_model: String,
    top_k: usize,
    min_score: f32,
    batch_size: usize,
    splitter: TextSplitter,
    chunks: RwLock<Vec<IndexedChunk>>,
}

impl VectorIndex {
    /// Create an index with default chunking (500/50) and `top_k` = 4.
    pub fn new(provider: Arc<dyn Provider>, embedding_model: impl Into<String>) -> Self {
        Self {
            provider,
            embedding_model: embedding_model.into(),
            top_k: 4,
            min_score: 0.0,
            batch_size: 64,
            splitter: TextSplitter::default(),
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &ikms_config::RetrievalConfig) -> Self {
        Self {
            provider,
            embedding_model: config.embedding_model.clone(),
            top_k: config.top_k.max(1),
            min_score: config.min_score,
            batch_size: config.embedding_batch_size.max(1),
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Extract the text of a PDF and index it under its path.
    ///
    /// Returns the number of chunks stored.
    pub async fn index_pdf(&self, path: &Path) -> Result<usize, IngestError> {
        let source = path.display().to_string();

        let bytes = tokio::fs::read(path).await.map_err(|e| IngestError::Read {
            path: source.clone(),
            reason: e.to_string(),
        })?;

        // pdf-extract is CPU-bound and synchronous.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| IngestError::Extraction {
                path: source.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| IngestError::Extraction {
                path: source.clone(),
                reason: e.to_string(),
            })?;

        debug!(source = %source, chars = text.len(), "Extracted PDF text");
        self.index_text(&source, &text).await
    }

    /// Chunk, embed and store `text` under `source`, replacing any chunks
    /// previously stored for the same source.
    pub async fn index_text(&self, source: &str, text: &str) -> Result<usize, IngestError> {
        let pieces = self.splitter.split(text);
        if pieces.is_empty() {
            return Err(IngestError::Empty(source.to_string()));
        }

        let mut embeddings = Vec::with_capacity(pieces.len());
        for batch in pieces.chunks(self.batch_size) {
            let vectors = self
                .embed(batch.to_vec())
                .await
                .map_err(|e| IngestError::EmbeddingFailed(e.to_string()))?;
            if vectors.len() != batch.len() {
                return Err(IngestError::EmbeddingFailed(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);
        }

        let new_chunks: Vec<IndexedChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (content, embedding))| IndexedChunk {
                id: uuid::Uuid::new_v4().to_string(),
                source: source.to_string(),
                chunk_index,
                content,
                embedding,
            })
            .collect();
        let count = new_chunks.len();

        let mut chunks = self.chunks.write().await;
        chunks.retain(|c| c.source != source);
        chunks.extend(new_chunks);

        info!(source = %source, chunks = count, total = chunks.len(), "Indexed document");
        Ok(count)
    }

    /// Remove every chunk of `source`. Returns how many were removed.
    pub async fn delete_by_source(&self, source: &str) -> usize {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|c| c.source != source);
        let removed = before - chunks.len();
        info!(source = %source, removed, "Deleted document vectors");
        removed
    }

    pub async fn delete_all(&self) {
        let mut chunks = self.chunks.write().await;
        let removed = chunks.len();
        chunks.clear();
        info!(removed, "Cleared vector index");
    }

    /// Distinct sources currently indexed, in first-indexed order.
    pub async fn sources(&self) -> Vec<String> {
        let chunks = self.chunks.read().await;
        let mut sources: Vec<String> = Vec::new();
        for chunk in chunks.iter() {
            if !sources.contains(&chunk.source) {
                sources.push(chunk.source.clone());
            }
        }
        sources
    }

    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs,
            })
            .await?;
        Ok(response.embeddings)
    }
}

#[async_trait]
impl SemanticSearch for VectorIndex {
    async fn search(&self, query: &str) -> Result<Vec<Passage>, RetrievalError> {
        if self.is_empty().await {
            debug!("Search on empty index");
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embed(vec![query.to_string()])
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("no embedding returned".into()))?;

        let chunks = self.chunks.read().await;
        let passages = vector_search(&chunks, &query_embedding, self.top_k, self.min_score);
        debug!(query_len = query.len(), hits = passages.len(), "Semantic search");
        Ok(passages)
    }
}

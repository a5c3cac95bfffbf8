//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity plus a brute-force ranker over embedded chunks.

use ikms_core::Passage;

/// One embedded chunk of an indexed document.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub id: String,
    /// Storage path of the document this chunk came from.
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl IndexedChunk {
    fn to_passage(&self, score: f32) -> Passage {
        Passage {
            id: self.id.clone(),
            source: self.source.clone(),
            chunk_index: self.chunk_index,
            content: self.content.clone(),
            score,
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank chunks by cosine similarity to a query embedding.
///
/// Returns at most `limit` passages sorted by descending similarity, keeping
/// only those scoring at least `min_score`. Ties keep insertion order, so
/// earlier chunks of a document win.
pub fn vector_search(
    chunks: &[IndexedChunk],
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<Passage> {
    let mut scored: Vec<(f32, &IndexedChunk)> = chunks
        .iter()
        .map(|chunk| (cosine_similarity(&chunk.embedding, query_embedding), chunk))
        .filter(|(sim, _)| *sim >= min_score)
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(score, chunk)| chunk.to_passage(score))
        .collect()
}

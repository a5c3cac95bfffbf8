//! Recursive character text splitter.
//!
//! Splits on the coarsest separator present in the text (paragraphs, then
//! lines, then words, then characters), recursing into any piece that is
//! still too long, and merges small pieces back into chunks of at most
//! `chunk_size` characters with `chunk_overlap` characters of carry-over.
//! Separators stay attached to the start of the piece that follows them.
//! Lengths are counted in `char`s.

use std::collections::VecDeque;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Coarsest separator that actually occurs; "" always matches.
        let (position, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_empty() || text.contains(s.as_str()))
            .map(|(i, s)| (i, s.as_str()))
            .unwrap_or((separators.len(), ""));
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }

            if finer.is_empty() {
                if let Some(chunk) = trimmed(piece) {
                    chunks.push(chunk);
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying a tail of up to
    /// `chunk_overlap` characters into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = trimmed(&window.iter().copied().collect::<String>()) {
                    chunks.push(chunk);
                }

                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = trimmed(&window.iter().copied().collect::<String>()) {
            chunks.push(chunk);
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

/// Split on `separator`, attaching each separator to the piece after it.
/// An empty separator splits into single characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, _) in text.match_indices(separator) {
        if i > start {
            pieces.push(&text[start..i]);
        }
        start = i;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

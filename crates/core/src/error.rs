//! Error types for the IKMS domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all IKMS operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Ingestion errors ---
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    // --- Structured output ---
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Query embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Search backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to extract text from {path}: {reason}")]
    Extraction { path: String, reason: String },

    #[error("Document {0} contains no extractable text")]
    Empty(String),

    #[error("Chunk embedding failed: {0}")]
    EmbeddingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn ingest_error_names_the_document() {
        let err = Error::Ingest(IngestError::Extraction {
            path: "data/uploads/paper.pdf".into(),
            reason: "encrypted".into(),
        });
        assert!(err.to_string().contains("paper.pdf"));
        assert!(err.to_string().contains("encrypted"));
    }

    #[test]
    fn malformed_output_is_distinct_from_provider_failure() {
        let err = Error::MalformedOutput("missing field `used_history`".into());
        assert!(!matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("used_history"));
    }
}

//! QA and document endpoints.
//!
//! - `POST   /qa/conversation`             Ask a question within a session
//! - `GET    /qa/session/{id}/history`     Turn history of a session
//! - `GET    /qa/session/{id}`             Full session record
//! - `DELETE /qa/session/{id}`             Drop a session
//! - `GET    /qa/sessions`                 List sessions, newest first
//! - `POST   /index-pdf`                   Upload and index a PDF (multipart `file`)
//! - `GET    /documents`                   List uploaded documents
//! - `DELETE /documents/{filename}`        Remove a document and its vectors

use std::path::Path as FsPath;

use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use ikms_agent::ConversationReply;
use ikms_core::error::IngestError;
use ikms_core::{Session, SessionId, SessionSummary, Turn};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::SharedState;

const PDF_CONTENT_TYPE: &str = "application/pdf";

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/qa/conversation", post(conversation_handler))
        .route("/qa/sessions", get(list_sessions_handler))
        .route("/qa/session/{id}/history", get(history_handler))
        .route(
            "/qa/session/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/index-pdf", post(index_pdf_handler))
        .route("/documents", get(list_documents_handler))
        .route("/documents/{filename}", delete(delete_document_handler))
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

fn internal_error() -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

// ── Conversation ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

async fn conversation_handler(
    State(state): State<SharedState>,
    Json(req): Json<ConversationRequest>,
) -> Result<Json<ConversationReply>, ApiError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Question must not be empty."));
    }

    // An empty id from a form field means "start a new session".
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .map(SessionId::from);

    match state.conversations.ask(question, session_id).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            error!(stage = %e.stage, error = %e, "Conversation request failed");
            Err(internal_error())
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: SessionId,
    pub session_title: String,
    pub history: Vec<Turn>,
}

async fn history_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    Ok(Json(HistoryResponse {
        session_title: session.display_title().to_string(),
        session_id: session.id,
        history: session.turns,
    }))
}

async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    find_session(&state, id).await.map(Json)
}

async fn find_session(state: &SharedState, id: String) -> Result<Session, ApiError> {
    state
        .conversations
        .session(&SessionId::from(id))
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Session not found"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

async fn list_sessions_handler(State(state): State<SharedState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.conversations.sessions().await,
    })
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = SessionId::from(id);
    if state.conversations.delete_session(&id).await {
        info!(session_id = %id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "Session not found"))
    }
}

// ── Documents ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexPdfResponse {
    pub filename: String,
    pub chunks_indexed: usize,
    pub message: String,
}

/// Keep only the final path component of a client-supplied name.
fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

async fn index_pdf_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<IndexPdfResponse>, ApiError> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        api_error(StatusCode::BAD_REQUEST, format!("Invalid upload: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        if field.name() != Some("file") {
            continue;
        }

        if field.content_type() != Some(PDF_CONTENT_TYPE) {
            return Err(api_error(StatusCode::BAD_REQUEST, "Only PDF files are supported."));
        }
        let filename = field
            .file_name()
            .and_then(sanitize_filename)
            .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Invalid filename."))?;
        let bytes = field.bytes().await.map_err(bad_form)?;

        return save_and_index(&state, filename, &bytes).await.map(Json);
    }

    Err(api_error(StatusCode::BAD_REQUEST, "Missing 'file' field."))
}

async fn save_and_index(
    state: &SharedState,
    filename: String,
    bytes: &[u8],
) -> Result<IndexPdfResponse, ApiError> {
    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!(error = %e, "Failed to create upload directory");
        internal_error()
    })?;
    let path = state.upload_dir.join(&filename);
    tokio::fs::write(&path, bytes).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to save upload");
        internal_error()
    })?;
    info!(filename = %filename, bytes = bytes.len(), "PDF uploaded");

    match state.index.index_pdf(&path).await {
        Ok(chunks_indexed) => Ok(IndexPdfResponse {
            filename,
            chunks_indexed,
            message: "PDF indexed successfully.".into(),
        }),
        Err(e) => {
            warn!(filename = %filename, error = %e, "Indexing failed");
            Err(ingest_error(&path, e).await)
        }
    }
}

/// Map an indexing failure to a response, discarding unreadable uploads.
async fn ingest_error(path: &FsPath, err: IngestError) -> ApiError {
    match err {
        IngestError::Extraction { .. } | IngestError::Empty(_) => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove rejected upload");
            }
            api_error(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        IngestError::EmbeddingFailed(_) => api_error(StatusCode::BAD_GATEWAY, err.to_string()),
        IngestError::Read { .. } => internal_error(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<String>,
}

async fn list_documents_handler(
    State(state): State<SharedState>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let mut documents = Vec::new();
    let mut entries = match tokio::fs::read_dir(&state.upload_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Json(DocumentListResponse { documents }));
        }
        Err(e) => {
            error!(error = %e, "Failed to list uploads");
            return Err(internal_error());
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.is_ok_and(|t| t.is_file()) {
            documents.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    documents.sort();

    Ok(Json(DocumentListResponse { documents }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    pub filename: String,
    pub chunks_deleted: usize,
}

async fn delete_document_handler(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteDocumentResponse>, ApiError> {
    if filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid filename."));
    }

    let path = state.upload_dir.join(&filename);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(api_error(StatusCode::NOT_FOUND, "Document not found"));
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to delete document");
            return Err(internal_error());
        }
    }

    let chunks_deleted = state.index.delete_by_source(&path.display().to_string()).await;
    info!(filename = %filename, chunks_deleted, "Document deleted");

    Ok(Json(DeleteDocumentResponse {
        filename,
        chunks_deleted,
    }))
}

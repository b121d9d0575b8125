//! Error handling for the document-extraction orchestrator's HTTP control
//! plane, mapping each of SPEC_FULL.md §7's error kinds to a status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type WebResult<T> = Result<T, WebError>;

#[derive(Debug, Error)]
pub enum WebError {
    /// `POST /extract` on a `(source, dataset)` pair that already has a
    /// non-terminal job.
    #[error("extraction already active for {source_name}/{dataset}")]
    AlreadyActive { source_name: String, dataset: String },

    /// Pause/cancel requested but no job is currently running.
    #[error("no active job for {source_name}/{dataset}")]
    NoActiveJob { source_name: String, dataset: String },

    /// Resume requested but the latest job isn't paused.
    #[error("nothing to resume for {source_name}/{dataset}")]
    NothingToResume { source_name: String, dataset: String },

    /// BlobStore couldn't find a referenced file.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// PDF-to-markdown conversion failed for a file.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// LLMClient call failed after exhausting retries (circuit open, or a
    /// permanent provider error).
    #[error("LLM backend unavailable: {0}")]
    LLMUnavailable(String),

    /// ResponseParser couldn't extract valid JSON from a model response.
    #[error("malformed model response: {0}")]
    MalformedModelResponse(String),

    /// Unexpected error from ProgressStore, treated as retryable by the
    /// caller per SPEC_FULL.md §7.
    #[error("progress store error: {0}")]
    StoreTransient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<progress_store::Error> for WebError {
    fn from(err: progress_store::Error) -> Self {
        match err {
            progress_store::Error::AlreadyActive { source_name, dataset } => {
                WebError::AlreadyActive { source_name, dataset }
            }
            progress_store::Error::NotFound(msg) => WebError::NotFound(msg),
            other => WebError::StoreTransient(other.to_string()),
        }
    }
}

impl From<schema_project::Error> for WebError {
    fn from(err: schema_project::Error) -> Self {
        WebError::MalformedModelResponse(err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::AlreadyActive { .. } => StatusCode::CONFLICT,
            WebError::NoActiveJob { .. } => StatusCode::BAD_REQUEST,
            WebError::NothingToResume { .. } => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) | WebError::Json(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) | WebError::BlobNotFound(_) => StatusCode::NOT_FOUND,
            WebError::ConversionFailed(_)
            | WebError::LLMUnavailable(_)
            | WebError::MalformedModelResponse(_)
            | WebError::StoreTransient(_)
            | WebError::Internal(_)
            | WebError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<&str> for WebError {
    fn from(msg: &str) -> Self {
        WebError::Internal(msg.to_string())
    }
}

impl From<String> for WebError {
    fn from(msg: String) -> Self {
        WebError::Internal(msg)
    }
}

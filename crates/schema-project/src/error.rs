//! Error types for schema projection and response parsing

use thiserror::Error;

/// Result type for schema-project operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No JSON object could be located in the model's free-form response,
    /// by any of the three parsing strategies. Corresponds to the core's
    /// `MalformedModelResponse` error kind.
    #[error("no JSON object found in model response")]
    MalformedModelResponse,

    /// A JSON object was located but failed to decode even after cleanup.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema document itself failed to compile as JSON-Schema.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

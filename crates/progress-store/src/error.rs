//! Error types for progress-store

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A non-terminal row already exists for this `(source, dataset)`.
    #[error("a non-terminal job already exists for ({source_name}, {dataset})")]
    AlreadyActive { source_name: String, dataset: String },

    /// No row at all (or no row matching the requested id) was found.
    #[error("job not found: {0}")]
    NotFound(String),

    /// `update_progress`/`append_reasoning` was called against a row whose
    /// status is not writable (a terminal status).
    #[error("job {0} is not in a writable state")]
    NotWritable(i64),

    /// `transition` was called with a `from` that doesn't match the row's
    /// current status.
    #[error("job {id} is not in status {expected}, transition rejected")]
    TransitionConflict { id: i64, expected: String },

    #[error("invalid job status: {0}")]
    InvalidStatus(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

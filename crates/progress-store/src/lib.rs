//! progress-store: durable, resumable job-progress tracking for the
//! extraction orchestrator.
//!
//! A `Job` is the single source of truth for one extraction run, keyed by
//! `(source, dataset)`. Every mutation the engine or job manager makes goes
//! through [`ProgressStore`], which commits each call as one atomic SQLite
//! transaction — there is no in-memory state here that survives a crash.
//!
//! # Example
//!
//! ```no_run
//! use progress_store::{ProgressStore, NewJob, backends::sqlite::SqliteProgressStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), progress_store::Error> {
//!     let store = SqliteProgressStore::open("progress.db").await?;
//!
//!     let id = store.create_job(NewJob {
//!         source: "local".into(),
//!         dataset: "invoices".into(),
//!         files: vec!["a.pdf".into()],
//!         schema: serde_json::json!({"type": "object"}),
//!         provider: "openai".into(),
//!         model: "gpt-4o-mini".into(),
//!         use_api: true,
//!         temperature: 0.3,
//!     }).await?;
//!
//!     let job = store.get_by_id(id).await?;
//!     println!("job {} is {:?}", job.id, job.status);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod backends;
pub mod error;

pub use error::Error;

/// Result type for progress-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Status of an extraction job. See SPEC_FULL.md §3 for the full state
/// machine (§4.8's diagram covers the transitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Scheduled,
    InProgress,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Cleared,
}

impl JobStatus {
    /// Non-terminal statuses are the ones counted by the at-most-one-active
    /// invariant and accepted by `UpdateProgress`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::Cleared
        )
    }

    pub fn is_writable(self) -> bool {
        matches!(
            self,
            JobStatus::InProgress | JobStatus::Scheduled | JobStatus::Paused
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Cleared => "cleared",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(JobStatus::Scheduled),
            "in_progress" => Ok(JobStatus::InProgress),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            "cleared" => Ok(JobStatus::Cleared),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// One entry in a job's `merge_reasoning_history` (SPEC_FULL.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasoningEntry {
    pub timestamp: i64,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub reasoning: serde_json::Value,
    pub is_final: bool,
}

/// LLM configuration recorded against a job (provider/model/mode/temperature).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub use_api: bool,
    pub temperature: f64,
}

/// Input to `ProgressStore::create_job`.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub source: String,
    pub dataset: String,
    pub files: Vec<String>,
    pub schema: serde_json::Value,
    pub provider: String,
    pub model: String,
    pub use_api: bool,
    pub temperature: f64,
}

/// One row of `extraction_progress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub source: String,
    pub dataset: String,
    pub status: JobStatus,
    pub message: Option<String>,

    pub total_files: i64,
    pub processed_files: i64,
    pub current_file: Option<String>,
    pub current_file_index: i64,
    pub file_progress: f64,
    pub total_chunks: i64,
    pub current_chunk: i64,

    pub files: Vec<String>,
    pub merged_data: Option<serde_json::Value>,
    pub merge_reasoning_history: Vec<ReasoningEntry>,
    pub schema: serde_json::Value,

    pub provider: String,
    pub model: String,
    pub use_api: bool,
    pub temperature: f64,

    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub duration: Option<f64>,
    pub updated_at: i64,
}

/// Partial update applied by `ProgressStore::update_progress`. Every field
/// is optional; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProgressPatch {
    pub status: Option<JobStatus>,
    pub message: Option<String>,
    pub processed_files: Option<i64>,
    pub current_file: Option<String>,
    pub current_file_index: Option<i64>,
    pub file_progress: Option<f64>,
    pub total_chunks: Option<i64>,
    pub current_chunk: Option<i64>,
    pub merged_data: Option<serde_json::Value>,
}

/// Durable, transactional persistence of one record per job (C1).
///
/// Every method commits as a single transaction; there is no write-behind
/// buffering (unlike `magnetar::JobManager`'s batched channel) because
/// invariant 5 — a reasoning-history append is paired with the `mergedData`
/// it describes in the same transaction — requires it.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Creates a new job with status `Scheduled`. Fails with
    /// `Error::AlreadyActive` if a non-terminal row already exists for
    /// `(source, dataset)`.
    async fn create_job(&self, spec: NewJob) -> Result<i64>;

    /// Returns the highest-`id` row for `(source, dataset)`, any status.
    async fn get_latest(&self, source: &str, dataset: &str) -> Result<Job>;

    async fn get_by_id(&self, id: i64) -> Result<Job>;

    /// Applies `patch` to the row for `(source, dataset)` iff its current
    /// status is writable (`Scheduled`, `InProgress`, or `Paused`). The read
    /// of the current status, the patch application, and the commit are one
    /// transaction.
    async fn update_progress(
        &self,
        source: &str,
        dataset: &str,
        patch: ProgressPatch,
    ) -> Result<()>;

    /// Atomically replaces `merged_data` and appends one `ReasoningEntry` to
    /// `merge_reasoning_history`.
    async fn append_reasoning(
        &self,
        source: &str,
        dataset: &str,
        merged_data: serde_json::Value,
        entry: ReasoningEntry,
    ) -> Result<()>;

    /// Conditional status change: succeeds only if the row's current status
    /// is `from`. `message` is recorded alongside the transition.
    async fn transition(
        &self,
        id: i64,
        from: JobStatus,
        to: JobStatus,
        message: Option<String>,
    ) -> Result<()>;

    /// Rows with status in `{Scheduled, Paused, InProgress with end_time = NULL}`,
    /// newest first.
    async fn list_pending(&self) -> Result<Vec<Job>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_display_and_from_str() {
        for status in [
            JobStatus::Scheduled,
            JobStatus::InProgress,
            JobStatus::Paused,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
            JobStatus::Cleared,
        ] {
            let s = status.to_string();
            assert_eq!(s.parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn terminal_statuses_are_not_writable() {
        for status in [
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
            JobStatus::Cleared,
        ] {
            assert!(status.is_terminal());
            assert!(!status.is_writable());
        }
        for status in [JobStatus::Scheduled, JobStatus::InProgress, JobStatus::Paused] {
            assert!(!status.is_terminal());
            assert!(status.is_writable());
        }
    }
}

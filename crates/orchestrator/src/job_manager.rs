//! JobManager (C7): the `Start`/`Pause`/`Resume`/`Cancel`/`Status` surface
//! the HTTP API calls into. Owns the at-most-one-active-job invariant and
//! the cooperative-cancellation contract — it never aborts a running
//! `ExtractionEngine::Run` task, only flips the status it checks between
//! chunks.

use crate::engine;
use crate::error::WebError;
use crate::state::AppState;
use progress_store::{Job, JobStatus, NewJob};
use serde_json::Value;

/// Parameters for starting a new extraction job — mirrors `NewJob` minus the
/// fields the manager fills in itself. `schema` is optional: when omitted,
/// `start()` resolves it from `SchemaStore`'s `(source, dataset)` mapping
/// (spec.md's `POST /extract` table, SPEC_FULL.md §6's `SchemaStore
/// (consumed)` note, `examples/original_source/routes/extractors.py:152-173`).
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub source: String,
    pub dataset: String,
    pub files: Vec<String>,
    pub schema: Option<Value>,
    pub provider: String,
    pub model: String,
    pub use_api: bool,
    pub temperature: f64,
}

/// Eager, pre-row validation of the LLM configuration (SPEC_FULL.md §4.7):
/// an API-backed provider needs credentials before any row is created, not
/// discovered mid-run on the first failed call.
fn validate_llm_config(req: &StartRequest) -> Result<(), WebError> {
    if req.use_api && req.provider.trim().is_empty() {
        return Err(WebError::BadRequest("provider must be set when use_api is true".to_string()));
    }
    if req.model.trim().is_empty() {
        return Err(WebError::BadRequest("model must not be empty".to_string()));
    }
    if req.files.is_empty() {
        return Err(WebError::BadRequest("files must not be empty".to_string()));
    }
    Ok(())
}

/// Creates a `scheduled` job and spawns the worker that drives it to
/// completion. Re-adopts (rather than rejects) a `(source, dataset)` that
/// already has a non-terminal job, returning that job's id instead of a
/// hard error — spec.md's HTTP table lists `POST /extract` as "202 / 200 if
/// already active", and `examples/original_source/routes/extractors.py:114-137`
/// returns 200 with "Continuing with existing extraction process" rather
/// than failing the request.
pub async fn start(state: &AppState, req: StartRequest) -> Result<i64, WebError> {
    validate_llm_config(&req)?;

    let schema = match req.schema {
        Some(schema) => schema,
        None => {
            state
                .schemas
                .get_schema(&req.source, &req.dataset)
                .await
                .map_err(|e| WebError::BadRequest(format!("no schema provided and none mapped: {}", e)))?
                .document
        }
    };

    let new_job = NewJob {
        source: req.source.clone(),
        dataset: req.dataset.clone(),
        files: req.files,
        schema,
        provider: req.provider,
        model: req.model,
        use_api: req.use_api,
        temperature: req.temperature,
    };

    let job_id = match state.progress.create_job(new_job).await {
        Ok(id) => id,
        Err(progress_store::Error::AlreadyActive { source_name: source, dataset }) => {
            let existing = state.progress.get_latest(&source, &dataset).await?;
            tracing::info!(job_id = existing.id, %source, %dataset, "continuing with existing extraction job");
            return Ok(existing.id);
        }
        Err(e) => return Err(e.into()),
    };

    spawn_worker(state.clone(), job_id);
    Ok(job_id)
}

fn spawn_worker(state: AppState, job_id: i64) {
    tokio::spawn(async move {
        if let Err(e) = engine::run(&state, job_id).await {
            tracing::warn!(job_id, error = %e, "extraction worker exited with an error");
        }
    });
}

/// `Transition(in_progress → paused)`. Succeeds (is a no-op) if the job is
/// already paused; fails with `NoActiveJob` if there's no non-terminal row.
pub async fn pause(state: &AppState, source: &str, dataset: &str) -> Result<(), WebError> {
    let job = active_job(state, source, dataset).await?;
    match job.status {
        JobStatus::Paused => Ok(()),
        JobStatus::InProgress | JobStatus::Scheduled => {
            state
                .progress
                .transition(
                    job.id,
                    job.status,
                    JobStatus::Paused,
                    Some("Extraction paused by user".to_string()),
                )
                .await?;
            Ok(())
        }
        _ => Err(WebError::NoActiveJob {
            source_name: source.to_string(),
            dataset: dataset.to_string(),
        }),
    }
}

/// `Transition(paused → scheduled)`. Does not run the job itself — the
/// `BatchPoller` picks up `scheduled` rows on its own sweep, so this just
/// wakes it rather than hand-running the engine directly (SPEC_FULL.md
/// §4.7/§4.8: the `scheduled → in_progress` edge after a Resume goes through
/// the poller, unlike `Start`'s direct hand-off).
pub async fn resume(state: &AppState, source: &str, dataset: &str) -> Result<(), WebError> {
    let job = state.progress.get_latest(source, dataset).await?;
    if job.status != JobStatus::Paused {
        return Err(WebError::NothingToResume {
            source_name: source.to_string(),
            dataset: dataset.to_string(),
        });
    }

    state
        .progress
        .transition(
            job.id,
            JobStatus::Paused,
            JobStatus::Scheduled,
            Some("Extraction scheduled for resumption".to_string()),
        )
        .await?;

    match &state.poller {
        Some(poller) => poller.wake(),
        None => tracing::warn!(job_id = job.id, "no poller handle attached, resumed job will wait for the next scheduled sweep"),
    }
    Ok(())
}

/// `Transition(any non-terminal → cancelled)`. Cooperative: the running
/// worker, if any, notices on its next status check and stops without
/// mutating further state.
pub async fn cancel(state: &AppState, source: &str, dataset: &str) -> Result<(), WebError> {
    let job = active_job(state, source, dataset).await?;
    state
        .progress
        .transition(
            job.id,
            job.status,
            JobStatus::Cancelled,
            Some("Extraction cancelled by user".to_string()),
        )
        .await?;
    Ok(())
}

/// Marks a job's row `cleared` so a new `Start` for the same `(source,
/// dataset)` is no longer blocked by a terminal row lingering as "latest".
/// Only valid once the job has reached a terminal status.
pub async fn clear(state: &AppState, source: &str, dataset: &str) -> Result<(), WebError> {
    let job = state.progress.get_latest(source, dataset).await?;
    if !job.status.is_terminal() {
        return Err(WebError::BadRequest(format!(
            "cannot clear job in status {}",
            job.status
        )));
    }
    state
        .progress
        .transition(job.id, job.status, JobStatus::Cleared, None)
        .await?;
    Ok(())
}

pub async fn status(state: &AppState, source: &str, dataset: &str) -> Result<Job, WebError> {
    Ok(state.progress.get_latest(source, dataset).await?)
}

async fn active_job(state: &AppState, source: &str, dataset: &str) -> Result<Job, WebError> {
    let job = state.progress.get_latest(source, dataset).await?;
    if job.status.is_terminal() {
        return Err(WebError::NoActiveJob {
            source_name: source.to_string(),
            dataset: dataset.to_string(),
        });
    }
    Ok(job)
}

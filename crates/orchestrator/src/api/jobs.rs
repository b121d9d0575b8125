//! The six HTTP endpoints SPEC_FULL.md §6 exposes over the `JobManager` (C7)
//! surface. Handler shape — `State<AppState>` extractor, `WebResult<Json<_>>`
//! return, `tracing::info!` on the happy path — follows `orbit-web`'s job
//! handlers.

use crate::error::WebResult;
use crate::job_manager::{self, StartRequest};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use progress_store::Job;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct StartExtractionRequest {
    pub files: Vec<String>,
    /// Optional: when omitted, `job_manager::start` resolves it from
    /// `SchemaStore`'s `(source, dataset)` mapping.
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub use_api: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_temperature() -> f64 {
    0.3
}

#[derive(Debug, Clone, Serialize)]
pub struct StartExtractionResponse {
    pub job_id: i64,
}

/// `POST /extract/{source}/{dataset}`
pub async fn start_extraction(
    State(state): State<AppState>,
    Path((source, dataset)): Path<(String, String)>,
    Json(body): Json<StartExtractionRequest>,
) -> WebResult<Json<StartExtractionResponse>> {
    let job_id = job_manager::start(
        &state,
        StartRequest {
            source: source.clone(),
            dataset: dataset.clone(),
            files: body.files,
            schema: body.schema,
            provider: body.provider,
            model: body.model,
            use_api: body.use_api,
            temperature: body.temperature,
        },
    )
    .await?;

    tracing::info!(job_id, source = %source, dataset = %dataset, "extraction started");
    Ok(Json(StartExtractionResponse { job_id }))
}

/// `POST /extraction-pause/{source}/{dataset}`
pub async fn pause_extraction(
    State(state): State<AppState>,
    Path((source, dataset)): Path<(String, String)>,
) -> WebResult<Json<()>> {
    job_manager::pause(&state, &source, &dataset).await?;
    tracing::info!(source = %source, dataset = %dataset, "extraction paused");
    Ok(Json(()))
}

/// `POST /extraction-resume/{source}/{dataset}`
pub async fn resume_extraction(
    State(state): State<AppState>,
    Path((source, dataset)): Path<(String, String)>,
) -> WebResult<Json<()>> {
    job_manager::resume(&state, &source, &dataset).await?;
    tracing::info!(source = %source, dataset = %dataset, "extraction resumed");
    Ok(Json(()))
}

/// `POST /clear-extraction-state/{source}/{dataset}`
pub async fn clear_extraction_state(
    State(state): State<AppState>,
    Path((source, dataset)): Path<(String, String)>,
) -> WebResult<Json<()>> {
    job_manager::clear(&state, &source, &dataset).await?;
    tracing::info!(source = %source, dataset = %dataset, "extraction state cleared");
    Ok(Json(()))
}

/// `GET /extraction-status/{source}/{dataset}`
pub async fn extraction_status(
    State(state): State<AppState>,
    Path((source, dataset)): Path<(String, String)>,
) -> WebResult<Json<Job>> {
    let job = job_manager::status(&state, &source, &dataset).await?;
    Ok(Json(job))
}

/// `GET /extraction-progress/list`
pub async fn list_extraction_progress(State(state): State<AppState>) -> WebResult<Json<Vec<Job>>> {
    let jobs = state.progress.list_pending().await?;
    Ok(Json(jobs))
}

//! ExtractionEngine (C6): the per-file cache→chunk→extract→merge pipeline.
//! `Run` is the top-level entry point invoked by both `JobManager.Start`'s
//! worker and `BatchPoller`.

use crate::chunker;
use crate::error::WebError;
use crate::prompt_builder;
use crate::state::AppState;
use chrono::Utc;
use progress_store::{JobStatus, ProgressPatch, ReasoningEntry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs the extraction pipeline for `job_id` to completion, pause, or
/// cancellation. Never panics on model or I/O errors — those are caught and
/// turned into a `failed` transition, per SPEC_FULL.md §4.6 step 3.
#[tracing::instrument(skip(state), fields(job_id = %job_id))]
pub async fn run(state: &AppState, job_id: i64) -> Result<(), WebError> {
    match run_inner(state, job_id).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(job_id, error = %e, "extraction job failed");
            let job = state.progress.get_by_id(job_id).await?;
            if !job.status.is_terminal() {
                let _ = state
                    .progress
                    .transition(job_id, job.status, JobStatus::Failed, Some(e.to_string()))
                    .await;
            }
            Err(e)
        }
    }
}

async fn run_inner(state: &AppState, job_id: i64) -> Result<(), WebError> {
    let job = state.progress.get_by_id(job_id).await?;

    if job.status == JobStatus::Scheduled {
        state
            .progress
            .transition(job_id, JobStatus::Scheduled, JobStatus::InProgress, None)
            .await?;
    }

    let mut markdown: HashMap<String, String> = HashMap::new();
    if suspended(state, &job.source, &job.dataset).await? {
        return Ok(());
    }
    fetch_markdown_batch(state, &job.source, &job.dataset, &job.files, &mut markdown).await?;
    if suspended(state, &job.source, &job.dataset).await? {
        return Ok(());
    }

    let start_index = job.current_file_index.max(0) as usize;
    for (index, filename) in job.files.iter().enumerate().skip(start_index) {
        if suspended(state, &job.source, &job.dataset).await? {
            return Ok(());
        }

        run_file(state, &job.source, &job.dataset, index, filename, &job.schema, &markdown).await?;

        state
            .progress
            .update_progress(
                &job.source,
                &job.dataset,
                ProgressPatch {
                    processed_files: Some(index as i64 + 1),
                    ..Default::default()
                },
            )
            .await?;
    }

    state
        .progress
        .transition(
            job_id,
            JobStatus::InProgress,
            JobStatus::Completed,
            Some("extraction completed".to_string()),
        )
        .await?;

    Ok(())
}

/// Re-reads status at a suspension point; returns `true` if the caller must
/// stop without further writes (SPEC_FULL.md §3 invariant 6).
async fn suspended(state: &AppState, source: &str, dataset: &str) -> Result<bool, WebError> {
    let job = state.progress.get_latest(source, dataset).await?;
    Ok(matches!(job.status, JobStatus::Paused | JobStatus::Cancelled))
}

async fn fetch_markdown_batch(
    state: &AppState,
    source: &str,
    dataset: &str,
    files: &[String],
    out: &mut HashMap<String, String>,
) -> Result<(), WebError> {
    let semaphore = Arc::new(Semaphore::new(state.config.max_pdf_concurrency));
    let mut handles = Vec::new();

    for filename in files {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let config = state.config.as_ref().clone();
        let blobs = state.blobs.clone();
        let source = source.to_string();
        let dataset = dataset.to_string();
        let filename = filename.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            let result = crate::markdown_cache::get_or_convert(&config, &source, &dataset, &filename, || {
                let blobs = blobs.clone();
                let dataset = dataset.clone();
                let filename = filename.clone();
                async move {
                    blobs
                        .get_file(&dataset, &filename)
                        .await
                        .map_err(|e| crate::markdown_cache::ConversionError::PdfConversion(e.to_string()))
                }
            })
            .await;
            (filename, result)
        }));
    }

    for handle in handles {
        let (filename, result) = handle.await.map_err(|e| WebError::Internal(e.to_string()))?;
        let text = result.map_err(|e| WebError::ConversionFailed(format!("{}: {}", filename, e)))?;
        out.insert(filename, text);
    }

    Ok(())
}

async fn run_file(
    state: &AppState,
    source: &str,
    dataset: &str,
    file_index: usize,
    filename: &str,
    schema: &Value,
    markdown: &HashMap<String, String>,
) -> Result<(), WebError> {
    state
        .progress
        .update_progress(
            source,
            dataset,
            ProgressPatch {
                current_file: Some(filename.to_string()),
                current_file_index: Some(file_index as i64),
                file_progress: Some(0.0),
                ..Default::default()
            },
        )
        .await?;

    let text = match markdown.get(filename) {
        Some(text) => text.clone(),
        None => {
            crate::markdown_cache::get_or_convert(&state.config, source, dataset, filename, || {
                let blobs = state.blobs.clone();
                let dataset = dataset.to_string();
                let filename = filename.to_string();
                async move {
                    blobs
                        .get_file(&dataset, &filename)
                        .await
                        .map_err(|e| crate::markdown_cache::ConversionError::PdfConversion(e.to_string()))
                }
            })
            .await
            .map_err(|e| WebError::ConversionFailed(e.to_string()))?
        }
    };

    let chunks = chunker::split(&text, state.config.max_chunk_chars);
    let total_chunks = chunks.len() as i64;

    state
        .progress
        .update_progress(
            source,
            dataset,
            ProgressPatch {
                total_chunks: Some(total_chunks),
                current_chunk: Some(0),
                ..Default::default()
            },
        )
        .await?;

    let mut chunk_results: Vec<Value> = Vec::new();

    for (chunk_index, chunk_text) in chunks.iter().enumerate() {
        if suspended(state, source, dataset).await? {
            return Ok(());
        }

        let prompt = prompt_builder::build_extraction_prompt(chunk_text, schema, chunk_index, chunks.len());
        let response = state
            .llm
            .generate(&prompt, state.config.llm_temperature, state.config.llm_max_tokens)
            .await
            .map_err(|e| WebError::LLMUnavailable(e.to_string()))?;

        let parsed = schema_project::parse(&response).unwrap_or_else(|_| json!({}));
        let data = schema_project::project(parsed.get("data").unwrap_or(&parsed), schema);
        chunk_results.push(json!({"data": data, "metadata": parsed.get("metadata").cloned().unwrap_or(json!({}))}));

        state
            .progress
            .update_progress(
                source,
                dataset,
                ProgressPatch {
                    current_chunk: Some(chunk_index as i64 + 1),
                    ..Default::default()
                },
            )
            .await?;

        if chunk_index > 0 && chunk_index % 2 == 0 {
            merge(state, source, dataset, &chunk_results, schema, chunk_index as i64, total_chunks, false).await?;
        }
    }

    if chunks.len() <= 1 {
        let data = chunk_results
            .first()
            .and_then(|r| r.get("data"))
            .cloned()
            .unwrap_or(json!({}));
        state
            .progress
            .append_reasoning(
                source,
                dataset,
                data,
                ReasoningEntry {
                    timestamp: Utc::now().timestamp(),
                    chunk_index: 0,
                    total_chunks,
                    reasoning: json!({"note": "single chunk, no merge required"}),
                    is_final: true,
                },
            )
            .await?;
    } else {
        merge(
            state,
            source,
            dataset,
            &chunk_results,
            schema,
            total_chunks - 1,
            total_chunks,
            true,
        )
        .await?;
    }

    state
        .progress
        .update_progress(
            source,
            dataset,
            ProgressPatch {
                file_progress: Some(1.0),
                ..Default::default()
            },
        )
        .await?;

    Ok(())
}

async fn merge(
    state: &AppState,
    source: &str,
    dataset: &str,
    chunk_results: &[Value],
    schema: &Value,
    chunk_index: i64,
    total_chunks: i64,
    is_final: bool,
) -> Result<(), WebError> {
    let prompt = if is_final {
        prompt_builder::build_final_prompt(chunk_results, schema)
    } else {
        prompt_builder::build_intermediate_prompt(chunk_results, schema)
    };

    let response = state
        .llm
        .generate(&prompt, state.config.llm_temperature, state.config.llm_max_tokens)
        .await
        .map_err(|e| WebError::LLMUnavailable(e.to_string()))?;

    let (merged_data, reasoning) = schema_project::parse_with_reasoning(&response, schema)?;

    state
        .progress
        .append_reasoning(
            source,
            dataset,
            merged_data,
            ReasoningEntry {
                timestamp: Utc::now().timestamp(),
                chunk_index,
                total_chunks,
                reasoning,
                is_final,
            },
        )
        .await?;

    Ok(())
}

//! SQLite backend for [`crate::ProgressStore`]
//!
//! WAL-mode single-pool setup, grounded on `magnetar::backends::sqlite::SqliteStore`.
//! Every trait method below commits as one transaction — there is no
//! write-behind buffering here, unlike `magnetar::manager::JobManager`.

use crate::{
    Error, Job, JobStatus, LlmConfig, NewJob, ProgressPatch, ProgressStore, ReasoningEntry, Result,
};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row};
use std::str::FromStr;

/// SQLite-backed `ProgressStore`.
pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    /// Opens or creates a SQLite database at `path`, configuring WAL mode
    /// and running migrations.
    pub async fn open(path: &str) -> Result<Self> {
        let db_url = if path.starts_with("sqlite://") {
            path.to_string()
        } else {
            format!("sqlite://{}", path)
        };

        if !sqlx::Sqlite::database_exists(&db_url)
            .await
            .unwrap_or(false)
        {
            sqlx::Sqlite::create_database(&db_url).await?;
        }

        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(sqlx::Error::from)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns the underlying pool, for callers that need to share it
    /// (e.g. `SchemaStore`'s SQLite-backed implementation in `orchestrator`).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_job(row: &SqliteRow) -> Result<Job> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str)?;

    let files_json: String = row.try_get("files")?;
    let files: Vec<String> = serde_json::from_str(&files_json)?;

    let schema_json: String = row.try_get("schema")?;
    let schema: serde_json::Value = serde_json::from_str(&schema_json)?;

    let merged_data_json: Option<String> = row.try_get("merged_data")?;
    let merged_data = merged_data_json
        .map(|s| serde_json::from_str(&s))
        .transpose()?;

    let history_json: Option<String> = row.try_get("merge_reasoning_history")?;
    let merge_reasoning_history: Vec<ReasoningEntry> = match history_json {
        Some(s) => serde_json::from_str(&s)?,
        None => Vec::new(),
    };

    Ok(Job {
        id: row.try_get("id")?,
        source: row.try_get("source")?,
        dataset: row.try_get("dataset")?,
        status,
        message: row.try_get("message")?,
        total_files: row.try_get("total_files")?,
        processed_files: row.try_get("processed_files")?,
        current_file: row.try_get("current_file")?,
        current_file_index: row.try_get("current_file_index")?,
        file_progress: row.try_get("file_progress")?,
        total_chunks: row.try_get("total_chunks")?,
        current_chunk: row.try_get("current_chunk")?,
        files,
        merged_data,
        merge_reasoning_history,
        schema,
        provider: row.try_get("provider")?,
        model: row.try_get("model")?,
        use_api: row.try_get::<i64, _>("use_api")? != 0,
        temperature: row.try_get("temperature")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        duration: row.try_get("duration")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn create_job(&self, spec: NewJob) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM extraction_progress
            WHERE source = ? AND dataset = ?
              AND status NOT IN ('completed', 'failed', 'cancelled', 'cleared')
            ORDER BY id DESC LIMIT 1
            "#,
        )
        .bind(&spec.source)
        .bind(&spec.dataset)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(_id) = existing {
            return Err(Error::AlreadyActive {
                source_name: spec.source,
                dataset: spec.dataset,
            });
        }

        let files_json = serde_json::to_string(&spec.files)?;
        let schema_json = serde_json::to_string(&spec.schema)?;
        let ts = now();

        let result = sqlx::query(
            r#"
            INSERT INTO extraction_progress (
                source, dataset, status, message,
                total_files, processed_files, current_file, current_file_index, file_progress,
                total_chunks, current_chunk, files, merged_data, merge_reasoning_history, schema,
                provider, model, use_api, temperature,
                start_time, end_time, duration, updated_at
            ) VALUES (
                ?, ?, 'scheduled', NULL,
                ?, 0, NULL, 0, 0.0,
                0, 0, ?, NULL, NULL, ?,
                ?, ?, ?, ?,
                NULL, NULL, NULL, ?
            )
            "#,
        )
        .bind(&spec.source)
        .bind(&spec.dataset)
        .bind(spec.files.len() as i64)
        .bind(&files_json)
        .bind(&schema_json)
        .bind(&spec.provider)
        .bind(&spec.model)
        .bind(spec.use_api as i64)
        .bind(spec.temperature)
        .bind(ts)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_latest(&self, source: &str, dataset: &str) -> Result<Job> {
        let row = sqlx::query(
            r#"
            SELECT * FROM extraction_progress
            WHERE source = ? AND dataset = ?
            ORDER BY id DESC LIMIT 1
            "#,
        )
        .bind(source)
        .bind(dataset)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{}/{}", source, dataset)))?;

        row_to_job(&row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Job> {
        let row = sqlx::query("SELECT * FROM extraction_progress WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        row_to_job(&row)
    }

    async fn update_progress(
        &self,
        source: &str,
        dataset: &str,
        patch: ProgressPatch,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, status FROM extraction_progress
            WHERE source = ? AND dataset = ?
            ORDER BY id DESC LIMIT 1
            "#,
        )
        .bind(source)
        .bind(dataset)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{}/{}", source, dataset)))?;

        let id: i64 = row.try_get("id")?;
        let status_str: String = row.try_get("status")?;
        let status = JobStatus::from_str(&status_str)?;

        if !status.is_writable() {
            return Err(Error::NotWritable(id));
        }

        let new_status = patch.status.map(|s| s.as_str().to_string());
        let ts = now();

        sqlx::query(
            r#"
            UPDATE extraction_progress SET
                status = COALESCE(?, status),
                message = COALESCE(?, message),
                processed_files = COALESCE(?, processed_files),
                current_file = COALESCE(?, current_file),
                current_file_index = COALESCE(?, current_file_index),
                file_progress = COALESCE(?, file_progress),
                total_chunks = COALESCE(?, total_chunks),
                current_chunk = COALESCE(?, current_chunk),
                merged_data = COALESCE(?, merged_data),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(new_status)
        .bind(patch.message)
        .bind(patch.processed_files)
        .bind(patch.current_file)
        .bind(patch.current_file_index)
        .bind(patch.file_progress)
        .bind(patch.total_chunks)
        .bind(patch.current_chunk)
        .bind(patch.merged_data.map(|v| v.to_string()))
        .bind(ts)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_reasoning(
        &self,
        source: &str,
        dataset: &str,
        merged_data: serde_json::Value,
        entry: ReasoningEntry,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, status, merge_reasoning_history FROM extraction_progress
            WHERE source = ? AND dataset = ?
            ORDER BY id DESC LIMIT 1
            "#,
        )
        .bind(source)
        .bind(dataset)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{}/{}", source, dataset)))?;

        let id: i64 = row.try_get("id")?;
        let status_str: String = row.try_get("status")?;
        let status = JobStatus::from_str(&status_str)?;
        if !status.is_writable() {
            return Err(Error::NotWritable(id));
        }

        let history_json: Option<String> = row.try_get("merge_reasoning_history")?;
        let mut history: Vec<ReasoningEntry> = match history_json {
            Some(s) => serde_json::from_str(&s)?,
            None => Vec::new(),
        };
        history.push(entry);

        sqlx::query(
            r#"
            UPDATE extraction_progress SET
                merged_data = ?,
                merge_reasoning_history = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(merged_data.to_string())
        .bind(serde_json::to_string(&history)?)
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn transition(
        &self,
        id: i64,
        from: JobStatus,
        to: JobStatus,
        message: Option<String>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status, start_time FROM extraction_progress WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let current_str: String = row.try_get("status")?;
        let current = JobStatus::from_str(&current_str)?;
        if current != from {
            return Err(Error::TransitionConflict {
                id,
                expected: from.to_string(),
            });
        }

        let ts = now();
        let start_time: Option<i64> = row.try_get("start_time")?;

        if to.is_terminal() {
            let start_time = start_time.unwrap_or(ts);
            let duration = (ts - start_time) as f64;
            sqlx::query(
                r#"
                UPDATE extraction_progress SET
                    status = ?, message = COALESCE(?, message),
                    start_time = COALESCE(start_time, ?),
                    end_time = ?, duration = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(to.as_str())
            .bind(message)
            .bind(start_time)
            .bind(ts)
            .bind(duration)
            .bind(ts)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        } else {
            let set_start = matches!(to, JobStatus::InProgress) && start_time.is_none();
            sqlx::query(
                r#"
                UPDATE extraction_progress SET
                    status = ?, message = COALESCE(?, message),
                    start_time = CASE WHEN ? THEN ? ELSE start_time END,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(to.as_str())
            .bind(message)
            .bind(set_start)
            .bind(ts)
            .bind(ts)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM extraction_progress
            WHERE status IN ('scheduled', 'paused')
               OR (status = 'in_progress' AND end_time IS NULL)
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_job).collect()
    }
}

impl Job {
    /// Convenience accessor bundling the LLM-config columns.
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            use_api: self.use_api,
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn open_test_store() -> (SqliteProgressStore, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let store = SqliteProgressStore::open(&path).await.unwrap();
        (store, file)
    }

    fn sample_spec() -> NewJob {
        NewJob {
            source: "local".into(),
            dataset: "invoices".into(),
            files: vec!["a.pdf".into(), "b.pdf".into()],
            schema: serde_json::json!({"type": "object", "properties": {"title": {"type": "string"}}}),
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            use_api: true,
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn create_and_get_job() {
        let (store, _tmp) = open_test_store().await;
        let id = store.create_job(sample_spec()).await.unwrap();
        let job = store.get_by_id(id).await.unwrap();

        assert_eq!(job.status, JobStatus::Scheduled);
        assert_eq!(job.total_files, 2);
        assert_eq!(job.files, vec!["a.pdf".to_string(), "b.pdf".to_string()]);
        assert!(job.merged_data.is_none());
        assert!(job.merge_reasoning_history.is_empty());
    }

    #[tokio::test]
    async fn create_job_rejects_second_active_row() {
        let (store, _tmp) = open_test_store().await;
        store.create_job(sample_spec()).await.unwrap();

        let err = store.create_job(sample_spec()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyActive { .. }));
    }

    #[tokio::test]
    async fn update_progress_is_rejected_once_terminal() {
        let (store, _tmp) = open_test_store().await;
        let id = store.create_job(sample_spec()).await.unwrap();

        store
            .transition(id, JobStatus::Scheduled, JobStatus::InProgress, None)
            .await
            .unwrap();
        store
            .transition(
                id,
                JobStatus::InProgress,
                JobStatus::Completed,
                Some("done".into()),
            )
            .await
            .unwrap();

        let job = store.get_by_id(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.end_time.is_some());
        assert!(job.duration.is_some());

        let err = store
            .update_progress("local", "invoices", ProgressPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotWritable(_)));
    }

    #[tokio::test]
    async fn transition_rejects_stale_from_state() {
        let (store, _tmp) = open_test_store().await;
        let id = store.create_job(sample_spec()).await.unwrap();

        let err = store
            .transition(id, JobStatus::InProgress, JobStatus::Paused, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransitionConflict { .. }));
    }

    #[tokio::test]
    async fn append_reasoning_couples_data_and_history() {
        let (store, _tmp) = open_test_store().await;
        let id = store.create_job(sample_spec()).await.unwrap();
        store
            .transition(id, JobStatus::Scheduled, JobStatus::InProgress, None)
            .await
            .unwrap();

        store
            .append_reasoning(
                "local",
                "invoices",
                serde_json::json!({"title": "X"}),
                ReasoningEntry {
                    timestamp: 1,
                    chunk_index: 1,
                    total_chunks: 3,
                    reasoning: serde_json::json!({"title": "took first non-null value"}),
                    is_final: false,
                },
            )
            .await
            .unwrap();

        let job = store.get_by_id(id).await.unwrap();
        assert_eq!(job.merged_data, Some(serde_json::json!({"title": "X"})));
        assert_eq!(job.merge_reasoning_history.len(), 1);
        assert!(!job.merge_reasoning_history[0].is_final);
    }

    #[tokio::test]
    async fn list_pending_includes_scheduled_and_paused_but_not_terminal() {
        let (store, _tmp) = open_test_store().await;
        let id1 = store.create_job(sample_spec()).await.unwrap();

        let mut spec2 = sample_spec();
        spec2.dataset = "receipts".into();
        let id2 = store.create_job(spec2).await.unwrap();

        store
            .transition(id2, JobStatus::Scheduled, JobStatus::InProgress, None)
            .await
            .unwrap();
        store
            .transition(id2, JobStatus::InProgress, JobStatus::Paused, None)
            .await
            .unwrap();

        let mut spec3 = sample_spec();
        spec3.dataset = "receipts-done".into();
        let id3 = store.create_job(spec3).await.unwrap();
        store
            .transition(id3, JobStatus::Scheduled, JobStatus::InProgress, None)
            .await
            .unwrap();
        store
            .transition(id3, JobStatus::InProgress, JobStatus::Completed, None)
            .await
            .unwrap();

        let pending = store.list_pending().await.unwrap();
        let ids: Vec<i64> = pending.iter().map(|j| j.id).collect();
        assert!(ids.contains(&id1));
        assert!(ids.contains(&id2));
        assert!(!ids.contains(&id3));
    }
}

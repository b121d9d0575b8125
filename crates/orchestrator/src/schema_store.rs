//! The `SchemaStore` external contract (SPEC_FULL.md §6): maps
//! `(source, dataset)` to a JSON-Schema document. Implemented here as a
//! SQLite-backed store reusing `original_source/db/models.py::Schema` and
//! `DatasetSchemaMapping`'s shape, since the spec's contract is otherwise
//! silent on storage and the original system persists schemas this way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaStoreError {
    #[error("no schema mapped for {source_name}/{dataset}")]
    NotFound { source_name: String, dataset: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SchemaStoreResult<T> = Result<T, SchemaStoreError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub id: i64,
    pub name: String,
    pub document: serde_json::Value,
}

#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn get_schema(&self, source: &str, dataset: &str) -> SchemaStoreResult<SchemaRecord>;
    async fn set_mapping(&self, source: &str, dataset: &str, schema_id: i64) -> SchemaStoreResult<()>;
    async fn put_schema(&self, name: &str, document: serde_json::Value) -> SchemaStoreResult<i64>;
}

pub struct SqliteSchemaStore {
    pool: SqlitePool,
}

impl SqliteSchemaStore {
    pub async fn open(path: &str) -> SchemaStoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", path))
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schemas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                document TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dataset_schema_mappings (
                source TEXT NOT NULL,
                dataset_name TEXT NOT NULL,
                schema_id INTEGER NOT NULL REFERENCES schemas(id),
                PRIMARY KEY (source, dataset_name)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SchemaStore for SqliteSchemaStore {
    async fn get_schema(&self, source: &str, dataset: &str) -> SchemaStoreResult<SchemaRecord> {
        let row = sqlx::query(
            r#"
            SELECT s.id, s.name, s.document
            FROM dataset_schema_mappings m
            JOIN schemas s ON s.id = m.schema_id
            WHERE m.source = ? AND m.dataset_name = ?
            "#,
        )
        .bind(source)
        .bind(dataset)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SchemaStoreError::NotFound {
            source_name: source.to_string(),
            dataset: dataset.to_string(),
        })?;

        let document_text: String = row.get(2);
        Ok(SchemaRecord {
            id: row.get(0),
            name: row.get(1),
            document: serde_json::from_str(&document_text)?,
        })
    }

    async fn set_mapping(&self, source: &str, dataset: &str, schema_id: i64) -> SchemaStoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dataset_schema_mappings (source, dataset_name, schema_id)
            VALUES (?, ?, ?)
            ON CONFLICT(source, dataset_name) DO UPDATE SET schema_id = excluded.schema_id
            "#,
        )
        .bind(source)
        .bind(dataset)
        .bind(schema_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_schema(&self, name: &str, document: serde_json::Value) -> SchemaStoreResult<i64> {
        let document_text = serde_json::to_string(&document)?;
        let result = sqlx::query("INSERT INTO schemas (name, document) VALUES (?, ?)")
            .bind(name)
            .bind(&document_text)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn open_test_store() -> (SqliteSchemaStore, tempfile::NamedTempFile) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = SqliteSchemaStore::open(file.path().to_str().unwrap()).await.unwrap();
        (store, file)
    }

    #[tokio::test]
    async fn put_map_and_get_round_trips() {
        let (store, _file) = open_test_store().await;
        let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});
        let id = store.put_schema("invoices-v1", schema.clone()).await.unwrap();
        store.set_mapping("local", "invoices", id).await.unwrap();

        let record = store.get_schema("local", "invoices").await.unwrap();
        assert_eq!(record.name, "invoices-v1");
        assert_eq!(record.document, schema);
    }

    #[tokio::test]
    async fn unmapped_dataset_is_not_found() {
        let (store, _file) = open_test_store().await;
        let err = store.get_schema("local", "nope").await.unwrap_err();
        assert!(matches!(err, SchemaStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn remapping_replaces_the_schema() {
        let (store, _file) = open_test_store().await;
        let a = store.put_schema("a", json!({"type": "object"})).await.unwrap();
        let b = store.put_schema("b", json!({"type": "array"})).await.unwrap();
        store.set_mapping("local", "ds", a).await.unwrap();
        store.set_mapping("local", "ds", b).await.unwrap();

        let record = store.get_schema("local", "ds").await.unwrap();
        assert_eq!(record.name, "b");
    }
}

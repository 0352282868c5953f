//! PostgreSQL + pgvector backend
//!
//! One table keyed by `document_id`, with an HNSW cosine index on the
//! embedding column. The table is created on connect using the configured
//! embedding dimension.
//!
//! Similarity is computed once as `real`, so the threshold comparison and
//! the value handed back to callers share the same precision.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::info;

use super::VectorBackend;
use crate::error::StoreError;
use crate::models::{DocumentMetadata, EmbeddingRecord, VectorMatch};

const TABLE_NAME: &str = "document_embeddings";

pub struct PgVectorBackend {
  pool: PgPool,
  dimension: usize,
  table: String,
}

impl PgVectorBackend {
  /// Connect, then make sure the extension, table and indexes exist
  pub async fn connect(
    database_url: &str,
    max_connections: u32,
    dimension: usize,
  ) -> Result<Self, StoreError> {
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
    let backend = Self::with_pool(pool, dimension);
    backend.ensure_schema().await?;
    Ok(backend)
  }

  pub fn with_pool(pool: PgPool, dimension: usize) -> Self {
    Self { pool, dimension, table: TABLE_NAME.to_string() }
  }

  /// Use a table other than `document_embeddings`
  pub fn with_table(mut self, table: impl Into<String>) -> Self {
    self.table = table.into();
    self
  }

  pub fn table(&self) -> &str {
    &self.table
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  pub async fn ensure_schema(&self) -> Result<(), StoreError> {
    for statement in schema_statements(&self.table, self.dimension) {
      sqlx::query(&statement).execute(&self.pool).await?;
    }
    info!(table = %self.table, dimension = self.dimension, "vector table ready");
    Ok(())
  }

  fn check_dimension(&self, embedding: &[f32]) -> Result<(), StoreError> {
    if embedding.len() != self.dimension {
      return Err(StoreError::Dimension { expected: self.dimension, actual: embedding.len() });
    }
    Ok(())
  }
}

fn schema_statements(table: &str, dimension: usize) -> Vec<String> {
  vec![
    "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
    format!(
      "CREATE TABLE IF NOT EXISTS {table} (
        document_id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        embedding vector({dimension}) NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
      )"
    ),
    format!(
      "CREATE INDEX IF NOT EXISTS {table}_embedding_idx
        ON {table} USING hnsw (embedding vector_cosine_ops)"
    ),
    format!(
      "CREATE INDEX IF NOT EXISTS {table}_created_at_idx ON {table} (created_at DESC)"
    ),
  ]
}

/// The threshold filter and the returned score are both `real`; rows are
/// ordered by raw distance
fn search_statement(table: &str) -> String {
  format!(
    "SELECT document_id, content, metadata, created_at,
            (1 - (embedding <=> $1))::real AS similarity
     FROM {table}
     WHERE (1 - (embedding <=> $1))::real > $2::real
     ORDER BY embedding <=> $1 ASC, created_at DESC, document_id ASC
     LIMIT $3"
  )
}

fn record_from_row(row: &PgRow) -> Result<EmbeddingRecord, StoreError> {
  let embedding: Vector = row.try_get("embedding")?;
  let Json(metadata): Json<DocumentMetadata> = row.try_get("metadata")?;
  Ok(EmbeddingRecord {
    document_id: row.try_get("document_id")?,
    content: row.try_get("content")?,
    embedding: embedding.to_vec(),
    metadata,
    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
  })
}

fn match_from_row(row: &PgRow) -> Result<VectorMatch, StoreError> {
  let Json(metadata): Json<DocumentMetadata> = row.try_get("metadata")?;
  Ok(VectorMatch {
    document_id: row.try_get("document_id")?,
    content: row.try_get("content")?,
    metadata,
    similarity: row.try_get::<f32, _>("similarity")?,
    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
  })
}

#[async_trait]
impl VectorBackend for PgVectorBackend {
  async fn upsert(
    &self,
    document_id: &str,
    content: &str,
    embedding: &[f32],
    metadata: &DocumentMetadata,
  ) -> Result<(), StoreError> {
    self.check_dimension(embedding)?;

    let table = &self.table;
    let statement = format!(
      "INSERT INTO {table} (document_id, content, embedding, metadata)
       VALUES ($1, $2, $3, $4)
       ON CONFLICT (document_id) DO UPDATE SET
         content = EXCLUDED.content,
         embedding = EXCLUDED.embedding,
         metadata = EXCLUDED.metadata,
         updated_at = NOW()"
    );
    sqlx::query(&statement)
      .bind(document_id)
      .bind(content)
      .bind(Vector::from(embedding.to_vec()))
      .bind(Json(metadata))
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn search(
    &self,
    query_embedding: &[f32],
    limit: usize,
    threshold: f32,
  ) -> Result<Vec<VectorMatch>, StoreError> {
    self.check_dimension(query_embedding)?;

    let statement = search_statement(&self.table);
    let rows = sqlx::query(&statement)
      .bind(Vector::from(query_embedding.to_vec()))
      .bind(threshold)
      .bind(limit as i64)
      .fetch_all(&self.pool)
      .await?;

    rows.iter().map(match_from_row).collect()
  }

  async fn get(&self, document_id: &str) -> Result<Option<EmbeddingRecord>, StoreError> {
    let table = &self.table;
    let statement = format!(
      "SELECT document_id, content, embedding, metadata, created_at, updated_at
       FROM {table} WHERE document_id = $1"
    );
    let row = sqlx::query(&statement).bind(document_id).fetch_optional(&self.pool).await?;
    row.as_ref().map(record_from_row).transpose()
  }

  async fn delete(&self, document_id: &str) -> Result<bool, StoreError> {
    let table = &self.table;
    let statement = format!("DELETE FROM {table} WHERE document_id = $1");
    let result = sqlx::query(&statement).bind(document_id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  async fn list(&self, limit: usize) -> Result<Vec<EmbeddingRecord>, StoreError> {
    let table = &self.table;
    let statement = format!(
      "SELECT document_id, content, embedding, metadata, created_at, updated_at
       FROM {table}
       ORDER BY created_at DESC, document_id ASC
       LIMIT $1"
    );
    let rows = sqlx::query(&statement).bind(limit as i64).fetch_all(&self.pool).await?;
    rows.iter().map(record_from_row).collect()
  }

  async fn count(&self) -> Result<usize, StoreError> {
    let table = &self.table;
    let statement = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = sqlx::query_scalar(&statement).fetch_one(&self.pool).await?;
    Ok(count.max(0) as usize)
  }
}

//! Query log in PostgreSQL, sharing the vector store's pool

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::QueryLog;
use crate::error::QueryLogError;
use crate::models::{ContextSource, QueryLogEntry};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS query_logs (
    id UUID PRIMARY KEY,
    query TEXT NOT NULL,
    answer TEXT NOT NULL,
    sources JSONB NOT NULL DEFAULT '[]'::jsonb,
    user_id TEXT,
    thread_id TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
  )";

const CREATE_INDEX: &str =
  "CREATE INDEX IF NOT EXISTS query_logs_user_created_idx ON query_logs (user_id, created_at DESC)";

pub struct PgQueryLog {
  pool: PgPool,
}

impl PgQueryLog {
  /// Wrap an existing pool, creating the table if needed
  pub async fn new(pool: PgPool) -> Result<Self, QueryLogError> {
    sqlx::query(CREATE_TABLE).execute(&pool).await?;
    sqlx::query(CREATE_INDEX).execute(&pool).await?;
    Ok(Self { pool })
  }
}

fn entry_from_row(row: &PgRow) -> Result<QueryLogEntry, QueryLogError> {
  let Json(sources): Json<Vec<ContextSource>> = row.try_get("sources")?;
  Ok(QueryLogEntry {
    id: row.try_get::<Uuid, _>("id")?,
    query: row.try_get("query")?,
    answer: row.try_get("answer")?,
    sources,
    user_id: row.try_get("user_id")?,
    thread_id: row.try_get("thread_id")?,
    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
  })
}

#[async_trait]
impl QueryLog for PgQueryLog {
  async fn record(&self, entry: &QueryLogEntry) -> Result<(), QueryLogError> {
    sqlx::query(
      "INSERT INTO query_logs (id, query, answer, sources, user_id, thread_id, created_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.id)
    .bind(&entry.query)
    .bind(&entry.answer)
    .bind(Json(&entry.sources))
    .bind(&entry.user_id)
    .bind(&entry.thread_id)
    .bind(entry.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn history(
    &self,
    limit: usize,
    user_id: Option<&str>,
  ) -> Result<Vec<QueryLogEntry>, QueryLogError> {
    let rows = sqlx::query(
      "SELECT id, query, answer, sources, user_id, thread_id, created_at
       FROM query_logs
       WHERE $1::text IS NULL OR user_id = $1
       ORDER BY created_at DESC
       LIMIT $2",
    )
    .bind(user_id)
    .bind(limit as i64)
    .fetch_all(&self.pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
  }

  async fn clear(&self, user_id: Option<&str>) -> Result<usize, QueryLogError> {
    let result = sqlx::query("DELETE FROM query_logs WHERE $1::text IS NULL OR user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() as usize)
  }
}

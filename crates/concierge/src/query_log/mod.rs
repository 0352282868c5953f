//! Audit log of answered queries

pub mod jsonl;
pub mod postgres;

use async_trait::async_trait;

use crate::error::QueryLogError;
use crate::models::QueryLogEntry;

pub use jsonl::JsonlQueryLog;
pub use postgres::PgQueryLog;

#[async_trait]
pub trait QueryLog: Send + Sync {
  async fn record(&self, entry: &QueryLogEntry) -> Result<(), QueryLogError>;

  /// Newest entries first, optionally restricted to one user
  async fn history(
    &self,
    limit: usize,
    user_id: Option<&str>,
  ) -> Result<Vec<QueryLogEntry>, QueryLogError>;

  /// Remove entries (all, or one user's) and return how many went
  async fn clear(&self, user_id: Option<&str>) -> Result<usize, QueryLogError>;
}

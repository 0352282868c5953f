//! In-process vector backend
//!
//! Keeps rows in a map behind an async lock and scores by brute force.
//! Timestamps come from a per-store monotonic clock so that back-to-back
//! writes always get distinct, ordered `created_at`/`updated_at` values.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::similarity::{compare_matches, cosine_similarity, passes_threshold};
use super::VectorBackend;
use crate::error::StoreError;
use crate::models::{DocumentMetadata, EmbeddingRecord, VectorMatch};

#[derive(Default)]
struct MemoryState {
  rows: HashMap<String, EmbeddingRecord>,
  clock: Option<DateTime<Utc>>,
}

impl MemoryState {
  fn tick(&mut self) -> DateTime<Utc> {
    let now = Utc::now();
    let next = match self.clock {
      Some(last) if now <= last => last + Duration::microseconds(1),
      _ => now,
    };
    self.clock = Some(next);
    next
  }
}

pub struct MemoryVectorBackend {
  dimension: usize,
  state: RwLock<MemoryState>,
}

impl MemoryVectorBackend {
  pub fn new(dimension: usize) -> Self {
    Self { dimension, state: RwLock::new(MemoryState::default()) }
  }

  fn check_dimension(&self, embedding: &[f32]) -> Result<(), StoreError> {
    if embedding.len() != self.dimension {
      return Err(StoreError::Dimension { expected: self.dimension, actual: embedding.len() });
    }
    Ok(())
  }
}

#[async_trait]
impl VectorBackend for MemoryVectorBackend {
  async fn upsert(
    &self,
    document_id: &str,
    content: &str,
    embedding: &[f32],
    metadata: &DocumentMetadata,
  ) -> Result<(), StoreError> {
    self.check_dimension(embedding)?;

    let mut state = self.state.write().await;
    let now = state.tick();
    let created_at = state.rows.get(document_id).map(|row| row.created_at).unwrap_or(now);

    state.rows.insert(
      document_id.to_string(),
      EmbeddingRecord {
        document_id: document_id.to_string(),
        content: content.to_string(),
        embedding: embedding.to_vec(),
        metadata: metadata.clone(),
        created_at,
        updated_at: now,
      },
    );
    Ok(())
  }

  async fn search(
    &self,
    query_embedding: &[f32],
    limit: usize,
    threshold: f32,
  ) -> Result<Vec<VectorMatch>, StoreError> {
    self.check_dimension(query_embedding)?;

    let state = self.state.read().await;
    let mut matches: Vec<VectorMatch> = state
      .rows
      .values()
      .filter_map(|row| {
        let similarity = cosine_similarity(query_embedding, &row.embedding);
        passes_threshold(similarity, threshold).then(|| VectorMatch {
          document_id: row.document_id.clone(),
          content: row.content.clone(),
          metadata: row.metadata.clone(),
          similarity,
          created_at: row.created_at,
        })
      })
      .collect();

    matches.sort_by(compare_matches);
    matches.truncate(limit);
    Ok(matches)
  }

  async fn get(&self, document_id: &str) -> Result<Option<EmbeddingRecord>, StoreError> {
    Ok(self.state.read().await.rows.get(document_id).cloned())
  }

  async fn delete(&self, document_id: &str) -> Result<bool, StoreError> {
    Ok(self.state.write().await.rows.remove(document_id).is_some())
  }

  async fn list(&self, limit: usize) -> Result<Vec<EmbeddingRecord>, StoreError> {
    let state = self.state.read().await;
    let mut rows: Vec<EmbeddingRecord> = state.rows.values().cloned().collect();
    rows.sort_by(|a, b| {
      b.created_at.cmp(&a.created_at).then_with(|| a.document_id.cmp(&b.document_id))
    });
    rows.truncate(limit);
    Ok(rows)
  }

  async fn count(&self) -> Result<usize, StoreError> {
    Ok(self.state.read().await.rows.len())
  }
}

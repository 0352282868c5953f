//! Vector store for document embeddings
//!
//! `VectorBackend` is the storage abstraction (PostgreSQL with pgvector in
//! production, an in-process map for tests and local runs). `VectorStore`
//! wraps a backend together with an `Embedder` and applies the retrieval
//! failure policy: storage problems degrade to `false`/empty results, while
//! a failure to embed a *query* is returned to the caller.

pub mod memory;
pub mod postgres;
pub mod similarity;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::error::{EmbeddingServiceError, StoreError};
use crate::models::{DocumentMetadata, EmbeddingRecord, VectorMatch};

pub use memory::MemoryVectorBackend;
pub use postgres::PgVectorBackend;

/// Storage interface for embedded documents
#[async_trait]
pub trait VectorBackend: Send + Sync {
  /// Insert or overwrite the row keyed by `document_id`
  async fn upsert(
    &self,
    document_id: &str,
    content: &str,
    embedding: &[f32],
    metadata: &DocumentMetadata,
  ) -> Result<(), StoreError>;

  /// Rows with similarity strictly above `threshold`, best first
  async fn search(
    &self,
    query_embedding: &[f32],
    limit: usize,
    threshold: f32,
  ) -> Result<Vec<VectorMatch>, StoreError>;

  async fn get(&self, document_id: &str) -> Result<Option<EmbeddingRecord>, StoreError>;

  /// Returns whether a row existed
  async fn delete(&self, document_id: &str) -> Result<bool, StoreError>;

  /// Most recently created rows first
  async fn list(&self, limit: usize) -> Result<Vec<EmbeddingRecord>, StoreError>;

  async fn count(&self) -> Result<usize, StoreError>;
}

/// Embedding-aware front end over a `VectorBackend`
#[derive(Clone)]
pub struct VectorStore {
  embedder: Arc<dyn Embedder>,
  backend: Arc<dyn VectorBackend>,
}

impl VectorStore {
  pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn VectorBackend>) -> Self {
    Self { embedder, backend }
  }

  /// Embed `content` and store it under `document_id`.
  ///
  /// Returns false instead of an error so ingestion can carry on without
  /// semantic search for this document.
  pub async fn upsert(&self, document_id: &str, content: &str, metadata: &DocumentMetadata) -> bool {
    let embedding = match self.embedder.embed(content).await {
      Ok(embedding) => embedding,
      Err(e) => {
        warn!(document_id, error = %e, "failed to embed document content");
        return false;
      }
    };

    match self.backend.upsert(document_id, content, &embedding, metadata).await {
      Ok(()) => {
        info!(document_id, "stored document embedding");
        true
      }
      Err(e) => {
        warn!(document_id, error = %e, "failed to store document embedding");
        false
      }
    }
  }

  /// Rank stored documents against `query_text`.
  ///
  /// Only an embedding failure is an error; a storage failure yields no
  /// matches.
  pub async fn search(
    &self,
    query_text: &str,
    limit: usize,
    threshold: f32,
  ) -> Result<Vec<VectorMatch>, EmbeddingServiceError> {
    let query_embedding = self.embedder.embed(query_text).await?;
    if limit == 0 {
      return Ok(Vec::new());
    }

    match self.backend.search(&query_embedding, limit, threshold).await {
      Ok(matches) => {
        if matches.is_empty() {
          debug!(threshold, "no documents cleared the similarity threshold");
        }
        Ok(matches)
      }
      Err(e) => {
        warn!(error = %e, "vector search failed");
        Ok(Vec::new())
      }
    }
  }

  pub async fn get(&self, document_id: &str) -> Option<EmbeddingRecord> {
    self.backend.get(document_id).await.unwrap_or_else(|e| {
      warn!(document_id, error = %e, "failed to load document embedding");
      None
    })
  }

  pub async fn delete(&self, document_id: &str) -> bool {
    match self.backend.delete(document_id).await {
      Ok(existed) => {
        if existed {
          info!(document_id, "deleted document embedding");
        }
        existed
      }
      Err(e) => {
        warn!(document_id, error = %e, "failed to delete document embedding");
        false
      }
    }
  }

  pub async fn list(&self, limit: usize) -> Vec<EmbeddingRecord> {
    self.backend.list(limit).await.unwrap_or_else(|e| {
      warn!(error = %e, "failed to list document embeddings");
      Vec::new()
    })
  }

  pub async fn count(&self) -> usize {
    self.backend.count().await.unwrap_or_else(|e| {
      warn!(error = %e, "failed to count document embeddings");
      0
    })
  }
}

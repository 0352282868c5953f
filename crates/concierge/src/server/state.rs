//! Shared handler state

use std::sync::Arc;

use crate::conversation::ConversationOrchestrator;
use crate::ingest::DocumentIngestor;
use crate::query_log::QueryLog;
use crate::vector_store::VectorStore;

/// Components built once at startup and cloned into every handler
#[derive(Clone)]
pub struct AppState {
  pub vector_store: VectorStore,
  pub ingestor: Arc<DocumentIngestor>,
  pub conversation: Arc<ConversationOrchestrator>,
  pub query_log: Arc<dyn QueryLog>,
  pub vector_backend: &'static str,
}

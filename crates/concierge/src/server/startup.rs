//! Component wiring and REST server startup

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::conversation::ConversationOrchestrator;
use crate::embedding::OpenAiEmbedder;
use crate::ingest::DocumentIngestor;
use crate::query_log::{JsonlQueryLog, PgQueryLog, QueryLog};
use crate::server::routing::create_router;
use crate::server::state::AppState;
use crate::services::openai::build_client;
use crate::services::{HttpOcrClient, OcrService, OpenAiAssistantClient};
use crate::vector_store::{MemoryVectorBackend, PgVectorBackend, VectorBackend, VectorStore};

/// Build every pipeline component from configuration
pub async fn build_state(config: &Config) -> Result<AppState> {
  let assistant_id =
    config.openai.assistant_id.clone().context("no assistant id configured")?;

  let client = build_client(&config.openai);
  let embedder = Arc::new(OpenAiEmbedder::new(client.clone(), &config.openai));
  let hosted = Arc::new(OpenAiAssistantClient::new(client));

  let (backend, query_log, vector_backend) = match &config.database.url {
    Some(url) => {
      let backend = PgVectorBackend::connect(
        url,
        config.database.max_connections,
        config.openai.embedding_dimension,
      )
      .await
      .context("failed to connect to the vector database")?;
      let query_log = PgQueryLog::new(backend.pool().clone())
        .await
        .context("failed to prepare the query log table")?;
      let backend: Arc<dyn VectorBackend> = Arc::new(backend);
      let query_log: Arc<dyn QueryLog> = Arc::new(query_log);
      (backend, query_log, "postgres")
    }
    None => {
      warn!("no database configured, keeping vectors in memory");
      let query_log = JsonlQueryLog::new(&config.query_log.path).with_context(|| {
        format!("failed to open query log at {}", config.query_log.path.display())
      })?;
      let backend: Arc<dyn VectorBackend> =
        Arc::new(MemoryVectorBackend::new(config.openai.embedding_dimension));
      let query_log: Arc<dyn QueryLog> = Arc::new(query_log);
      (backend, query_log, "memory")
    }
  };

  let ocr: Option<Arc<dyn OcrService>> = match &config.ocr.endpoint {
    Some(endpoint) => {
      let client: Arc<dyn OcrService> =
        Arc::new(HttpOcrClient::new(endpoint, Duration::from_secs(config.ocr.timeout_secs))?);
      Some(client)
    }
    None => {
      info!("no OCR endpoint configured, scanned documents will be stored without text");
      None
    }
  };

  let vector_store = VectorStore::new(embedder, backend);
  let ingestor = DocumentIngestor::new(
    vector_store.clone(),
    hosted.clone(),
    ocr,
    config.ocr.language.clone(),
  );
  let conversation = ConversationOrchestrator::new(
    vector_store.clone(),
    hosted.clone(),
    hosted,
    query_log.clone(),
    assistant_id,
    config.retrieval.clone(),
    config.conversation.clone(),
  );

  Ok(AppState {
    vector_store,
    ingestor: Arc::new(ingestor),
    conversation: Arc::new(conversation),
    query_log,
    vector_backend,
  })
}

/// Start the REST server and run until interrupted
pub async fn start_server(config: Config) -> Result<()> {
  config.validate(true)?;
  let state = build_state(&config).await?;
  let app = create_router(state);

  let listener = TcpListener::bind(config.server.bind)
    .await
    .with_context(|| format!("failed to bind {}", config.server.bind))?;
  info!(addr = %config.server.bind, "server listening");

  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!("server shut down gracefully");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}

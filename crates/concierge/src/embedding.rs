//! Embedding client: turns text into fixed-length vectors
//!
//! The `Embedder` trait is the seam the vector store depends on, so the
//! hosted embedding endpoint can be replaced in tests and local runs.

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::EmbeddingServiceError;

/// Anything that can vectorize text
#[async_trait]
pub trait Embedder: Send + Sync {
  /// Embed a single non-empty text. Not retried; callers decide.
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError>;

  /// Length of every vector this embedder returns
  fn dimension(&self) -> usize;
}

/// Embedder backed by the hosted embeddings endpoint
pub struct OpenAiEmbedder {
  client: Client<OpenAIConfig>,
  model: String,
  dimension: usize,
  max_input_chars: usize,
}

impl OpenAiEmbedder {
  pub fn new(client: Client<OpenAIConfig>, config: &OpenAiConfig) -> Self {
    Self {
      client,
      model: config.embedding_model.clone(),
      dimension: config.embedding_dimension,
      max_input_chars: config.max_input_chars,
    }
  }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
    let input = prepare_input(text, self.max_input_chars)?;
    debug!(model = %self.model, chars = input.chars().count(), "requesting embedding");

    let request = CreateEmbeddingRequestArgs::default()
      .model(self.model.as_str())
      .input(input)
      .build()
      .map_err(|e| EmbeddingServiceError::Request { message: e.to_string() })?;

    let response = self
      .client
      .embeddings()
      .create(request)
      .await
      .map_err(|e| EmbeddingServiceError::Request { message: e.to_string() })?;

    let embedding = response
      .data
      .into_iter()
      .next()
      .map(|item| item.embedding)
      .ok_or(EmbeddingServiceError::EmptyResponse)?;

    check_dimension(embedding, self.dimension)
  }

  fn dimension(&self) -> usize {
    self.dimension
  }
}

/// Trim the input, reject it if nothing is left, and cap its length
pub fn prepare_input(text: &str, max_chars: usize) -> Result<String, EmbeddingServiceError> {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Err(EmbeddingServiceError::EmptyInput);
  }

  match trimmed.char_indices().nth(max_chars) {
    Some((cut, _)) => Ok(trimmed[..cut].to_string()),
    None => Ok(trimmed.to_string()),
  }
}

/// Ensure a returned vector matches the configured dimension
pub fn check_dimension(
  embedding: Vec<f32>,
  expected: usize,
) -> Result<Vec<f32>, EmbeddingServiceError> {
  if embedding.is_empty() {
    return Err(EmbeddingServiceError::EmptyResponse);
  }
  if embedding.len() != expected {
    return Err(EmbeddingServiceError::DimensionMismatch { expected, actual: embedding.len() });
  }
  Ok(embedding)
}

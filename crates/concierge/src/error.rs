//! Error types for each pipeline component
//!
//! Hard failures propagate through these types. Soft failures are logged
//! where they happen and folded into result flags instead.

use std::time::Duration;
use thiserror::Error;

use crate::models::RunStatus;

#[derive(Error, Debug)]
pub enum EmbeddingServiceError {
  #[error("Cannot embed empty text")]
  EmptyInput,

  #[error("Embedding service request failed: {message}")]
  Request { message: String },

  #[error("Embedding service returned no vector")]
  EmptyResponse,

  #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Embedding has {actual} dimensions, table expects {expected}")]
  Dimension { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum OcrError {
  #[error("OCR does not support '.{extension}' files")]
  UnsupportedFormat { extension: String },

  #[error("OCR request failed: {message}")]
  Request { message: String },

  #[error("OCR service error: {message}")]
  Service { message: String },
}

#[derive(Error, Debug)]
pub enum HostedServiceError {
  #[error("Hosted service request failed: {message}")]
  Request { message: String },
}

#[derive(Error, Debug)]
pub enum IngestError {
  #[error("Invalid upload: {reason}")]
  InvalidUpload { reason: String },

  #[error("Upload to hosted file store failed: {0}")]
  HostedUpload(#[source] HostedServiceError),
}

#[derive(Error, Debug)]
pub enum ConversationError {
  #[error("Query is empty")]
  EmptyQuery,

  #[error("Failed to embed query: {0}")]
  Embedding(#[from] EmbeddingServiceError),

  #[error("Assistant service error: {0}")]
  Hosted(#[from] HostedServiceError),

  #[error("Run ended with status '{status}'{}", describe_last_error(.last_error))]
  RunFailed { status: RunStatus, last_error: Option<String> },

  #[error("Run {run_id} did not finish within {elapsed:?}")]
  RunTimeout { run_id: String, elapsed: Duration },

  #[error("Thread {thread_id} has no assistant reply")]
  NoAnswer { thread_id: String },
}

#[derive(Error, Debug)]
pub enum QueryLogError {
  #[error("Query log I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("Query log database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Query log serialization failed: {0}")]
  Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("Invalid configuration: {0}")]
  Invalid(String),
}

fn describe_last_error(last_error: &Option<String>) -> String {
  last_error.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
}

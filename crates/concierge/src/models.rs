//! Shared data model for ingestion, retrieval and query auditing

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Metadata stored alongside every embedded document.
///
/// Common fields are typed; anything else a caller attaches lands in `extra`
/// and is flattened into the same JSON object on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub original_filename: Option<String>,

  /// File id in the hosted file store, used for cross-referencing
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub external_file_id: Option<String>,

  #[serde(default)]
  pub ocr_processed: bool,

  #[serde(default)]
  pub text_extracted: bool,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ocr_confidence: Option<f32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uploaded_at: Option<DateTime<Utc>>,

  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// A stored, embedded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
  pub document_id: String,
  pub content: String,
  pub embedding: Vec<f32>,
  pub metadata: DocumentMetadata,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A similarity search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VectorMatch {
  pub document_id: String,
  pub content: String,
  pub metadata: DocumentMetadata,
  /// Cosine similarity, `1 - cosine_distance`
  pub similarity: f32,
  pub created_at: DateTime<Utc>,
}

/// Result of one OCR extraction call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrOutcome {
  pub success: bool,
  #[serde(default)]
  pub text: String,
  #[serde(default)]
  pub confidence: Option<f32>,
  #[serde(default)]
  pub word_count: usize,
  #[serde(default)]
  pub character_count: usize,
  #[serde(default)]
  pub pages_processed: usize,
  #[serde(default)]
  pub error: Option<String>,
}

/// OCR outcome as reported back to the uploader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OcrMetadata {
  pub ocr_processed: bool,
  pub text_extracted: bool,
  pub confidence: Option<f32>,
  pub character_count: usize,
  pub word_count: usize,
  pub pages_processed: usize,
  pub error: Option<String>,
}

/// Outcome of a single document upload across both sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IngestionResult {
  pub document_id: String,
  /// Key of the row in the vector store (set even when the write failed)
  pub vector_document_id: String,
  pub filename: String,
  pub title: String,
  pub category: String,
  pub ocr: OcrMetadata,
  pub external_file_id: String,
  pub vector_stored: bool,
  /// True iff the document has a row in the vector store
  pub searchable: bool,
  pub uploaded_at: DateTime<Utc>,
}

/// Outcome of removing a document from both sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RemovalResult {
  pub vector_document_id: String,
  pub vector_deleted: bool,
  pub external_file_id: Option<String>,
  pub hosted_file_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
  VectorDocument,
  OpenaiFile,
}

/// One piece of context that contributed to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContextSource {
  pub kind: SourceKind,
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub similarity: Option<f32>,
}

impl ContextSource {
  pub fn vector(hit: &VectorMatch) -> Self {
    Self {
      kind: SourceKind::VectorDocument,
      id: hit.document_id.clone(),
      title: hit.metadata.title.clone(),
      similarity: Some(hit.similarity),
    }
  }

  pub fn hosted_file(file: &HostedFile) -> Self {
    Self {
      kind: SourceKind::OpenaiFile,
      id: format!("openai_file_{}", file.file_id),
      title: Some(file.filename.clone()),
      similarity: None,
    }
  }
}

/// Audit record of one completed question/answer exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryLogEntry {
  pub id: Uuid,
  pub query: String,
  pub answer: String,
  pub sources: Vec<ContextSource>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thread_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl QueryLogEntry {
  pub fn new(
    query: &str,
    answer: &str,
    sources: Vec<ContextSource>,
    user_id: Option<String>,
    thread_id: Option<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      query: query.to_string(),
      answer: answer.to_string(),
      sources,
      user_id,
      thread_id,
      created_at: Utc::now(),
    }
  }
}

/// Answer returned by the conversation orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryAnswer {
  pub answer: String,
  pub thread_id: String,
  pub sources: Vec<ContextSource>,
  pub vector_context_used: bool,
  pub vector_source_count: usize,
  pub attached_file_count: usize,
}

/// A file held by the hosted file store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedFile {
  pub file_id: String,
  pub filename: String,
  pub bytes: u64,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
  User,
  Assistant,
}

/// A message in a hosted conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
  pub role: MessageRole,
  pub content: String,
  pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a hosted assistant run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Queued,
  InProgress,
  RequiresAction,
  Cancelling,
  Completed,
  Failed,
  Cancelled,
  Expired,
  Incomplete,
}

impl RunStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      RunStatus::Completed
        | RunStatus::Failed
        | RunStatus::Cancelled
        | RunStatus::Expired
        | RunStatus::Incomplete
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      RunStatus::Queued => "queued",
      RunStatus::InProgress => "in_progress",
      RunStatus::RequiresAction => "requires_action",
      RunStatus::Cancelling => "cancelling",
      RunStatus::Completed => "completed",
      RunStatus::Failed => "failed",
      RunStatus::Cancelled => "cancelled",
      RunStatus::Expired => "expired",
      RunStatus::Incomplete => "incomplete",
    }
  }
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Polled state of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
  pub status: RunStatus,
  pub last_error: Option<String>,
}

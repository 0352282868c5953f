//! Fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mockall::mock;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use concierge::config::{ConversationConfig, RetrievalConfig};
use concierge::conversation::ConversationOrchestrator;
use concierge::embedding::Embedder;
use concierge::error::{
  EmbeddingServiceError, HostedServiceError, OcrError, QueryLogError, StoreError,
};
use concierge::ingest::DocumentIngestor;
use concierge::models::{
  DocumentMetadata, EmbeddingRecord, HostedFile, MessageRole, OcrOutcome, QueryLogEntry, RunState,
  RunStatus, ThreadMessage, VectorMatch,
};
use concierge::query_log::{JsonlQueryLog, QueryLog};
use concierge::services::{HostedAssistant, HostedFileStore, OcrService};
use concierge::vector_store::{MemoryVectorBackend, VectorBackend, VectorStore};

// Embedders
// =========

const VOCABULARY: &[&str] =
  &["pool", "hours", "open", "parking", "garage", "gym", "laundry", "lease", "pets"];

/// Bag-of-keywords embedder: one dimension per vocabulary word plus a bias
pub struct KeywordEmbedder;

pub const KEYWORD_DIMENSION: usize = VOCABULARY.len() + 1;

#[async_trait]
impl Embedder for KeywordEmbedder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
    if text.trim().is_empty() {
      return Err(EmbeddingServiceError::EmptyInput);
    }
    let mut vector = vec![0.0; KEYWORD_DIMENSION];
    vector[VOCABULARY.len()] = 0.1;
    for word in text.split(|c: char| !c.is_alphanumeric()) {
      let word = word.to_lowercase();
      if let Some(i) = VOCABULARY.iter().position(|v| *v == word) {
        vector[i] += 1.0;
      }
    }
    Ok(vector)
  }

  fn dimension(&self) -> usize {
    KEYWORD_DIMENSION
  }
}

/// Returns preset vectors for known texts
pub struct StaticEmbedder {
  vectors: HashMap<String, Vec<f32>>,
  dimension: usize,
}

impl StaticEmbedder {
  pub fn new(dimension: usize, vectors: &[(&str, Vec<f32>)]) -> Self {
    Self {
      vectors: vectors.iter().map(|(text, v)| (text.to_string(), v.clone())).collect(),
      dimension,
    }
  }
}

#[async_trait]
impl Embedder for StaticEmbedder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
    self
      .vectors
      .get(text)
      .cloned()
      .ok_or_else(|| EmbeddingServiceError::Request { message: format!("unknown text: {text}") })
  }

  fn dimension(&self) -> usize {
    self.dimension
  }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
  async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
    Err(EmbeddingServiceError::Request { message: "embedding service unreachable".to_string() })
  }

  fn dimension(&self) -> usize {
    KEYWORD_DIMENSION
  }
}

// Vector backends
// ===============

/// Backend whose every call fails
pub struct FailingBackend;

fn broken() -> StoreError {
  StoreError::Dimension { expected: 0, actual: 0 }
}

#[async_trait]
impl VectorBackend for FailingBackend {
  async fn upsert(
    &self,
    _document_id: &str,
    _content: &str,
    _embedding: &[f32],
    _metadata: &DocumentMetadata,
  ) -> Result<(), StoreError> {
    Err(broken())
  }

  async fn search(
    &self,
    _query_embedding: &[f32],
    _limit: usize,
    _threshold: f32,
  ) -> Result<Vec<VectorMatch>, StoreError> {
    Err(broken())
  }

  async fn get(&self, _document_id: &str) -> Result<Option<EmbeddingRecord>, StoreError> {
    Err(broken())
  }

  async fn delete(&self, _document_id: &str) -> Result<bool, StoreError> {
    Err(broken())
  }

  async fn list(&self, _limit: usize) -> Result<Vec<EmbeddingRecord>, StoreError> {
    Err(broken())
  }

  async fn count(&self) -> Result<usize, StoreError> {
    Err(broken())
  }
}

pub fn keyword_store() -> VectorStore {
  VectorStore::new(Arc::new(KeywordEmbedder), Arc::new(MemoryVectorBackend::new(KEYWORD_DIMENSION)))
}

pub fn failing_store() -> VectorStore {
  VectorStore::new(Arc::new(KeywordEmbedder), Arc::new(FailingBackend))
}

// Hosted file store
// =================

#[derive(Default)]
struct FileStoreState {
  files: Vec<(HostedFile, Vec<u8>)>,
  next_id: usize,
}

/// In-memory hosted file store; ids look like `file-1`, `file-2`, ...
#[derive(Default)]
pub struct FakeFileStore {
  state: Mutex<FileStoreState>,
  fail_uploads: bool,
  fail_list: bool,
  fail_delete: bool,
}

impl FakeFileStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn rejecting_uploads() -> Self {
    Self { fail_uploads: true, ..Self::default() }
  }

  pub fn unlistable() -> Self {
    Self { fail_list: true, ..Self::default() }
  }

  pub fn undeletable() -> Self {
    Self { fail_delete: true, ..Self::default() }
  }

  /// Stored files as (filename, bytes)
  pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
    let state = self.state.lock().unwrap();
    state.files.iter().map(|(f, b)| (f.filename.clone(), b.clone())).collect()
  }

  pub fn content(&self, file_id: &str) -> Option<Vec<u8>> {
    let state = self.state.lock().unwrap();
    state.files.iter().find(|(f, _)| f.file_id == file_id).map(|(_, b)| b.clone())
  }

  /// Add a file directly, `age_secs` seconds in the past
  pub fn seed(&self, filename: &str, age_secs: i64) -> String {
    let mut state = self.state.lock().unwrap();
    state.next_id += 1;
    let file_id = format!("file-{}", state.next_id);
    state.files.push((
      HostedFile {
        file_id: file_id.clone(),
        filename: filename.to_string(),
        bytes: 1,
        created_at: Utc::now() - Duration::seconds(age_secs),
      },
      Vec::new(),
    ));
    file_id
  }
}

#[async_trait]
impl HostedFileStore for FakeFileStore {
  async fn upload(
    &self,
    bytes: Vec<u8>,
    filename: &str,
    _purpose: &str,
  ) -> Result<String, HostedServiceError> {
    if self.fail_uploads {
      return Err(HostedServiceError::Request { message: "upload rejected".to_string() });
    }
    let mut state = self.state.lock().unwrap();
    state.next_id += 1;
    let file_id = format!("file-{}", state.next_id);
    state.files.push((
      HostedFile {
        file_id: file_id.clone(),
        filename: filename.to_string(),
        bytes: bytes.len() as u64,
        created_at: Utc::now(),
      },
      bytes,
    ));
    Ok(file_id)
  }

  async fn list(&self, _purpose: &str) -> Result<Vec<HostedFile>, HostedServiceError> {
    if self.fail_list {
      return Err(HostedServiceError::Request { message: "listing unavailable".to_string() });
    }
    let state = self.state.lock().unwrap();
    Ok(state.files.iter().map(|(f, _)| f.clone()).collect())
  }

  async fn delete(&self, file_id: &str) -> Result<bool, HostedServiceError> {
    if self.fail_delete {
      return Err(HostedServiceError::Request { message: "delete rejected".to_string() });
    }
    let mut state = self.state.lock().unwrap();
    let before = state.files.len();
    state.files.retain(|(f, _)| f.file_id != file_id);
    Ok(state.files.len() < before)
  }
}

// Hosted assistant
// ================

/// How the fake assistant replies once a run completes
pub enum Reply {
  /// Repeat the last user message back
  Echo,
  /// Quote the attached files, like the hosted file search tool would
  FileSearch,
  Fixed(String),
  Silent,
}

#[derive(Default)]
struct AssistantState {
  threads: usize,
  runs: usize,
  messages: HashMap<String, Vec<ThreadMessage>>,
  attachments: Vec<Vec<String>>,
}

/// Scripted assistant: run statuses are served in order, the last one repeats
pub struct FakeAssistant {
  statuses: Mutex<VecDeque<RunStatus>>,
  reply: Reply,
  files: Option<Arc<FakeFileStore>>,
  state: Mutex<AssistantState>,
}

impl FakeAssistant {
  pub fn new(statuses: &[RunStatus], reply: Reply) -> Self {
    Self {
      statuses: Mutex::new(statuses.iter().copied().collect()),
      reply,
      files: None,
      state: Mutex::new(AssistantState::default()),
    }
  }

  /// File store that `Reply::FileSearch` reads attachments from
  pub fn with_files(mut self, files: Arc<FakeFileStore>) -> Self {
    self.files = Some(files);
    self
  }

  pub fn completing(reply: Reply) -> Self {
    Self::new(&[RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed], reply)
  }

  pub fn threads_created(&self) -> usize {
    self.state.lock().unwrap().threads
  }

  /// User messages posted to `thread_id`
  pub fn prompts(&self, thread_id: &str) -> Vec<String> {
    let state = self.state.lock().unwrap();
    state
      .messages
      .get(thread_id)
      .map(|m| {
        m.iter().filter(|m| m.role == MessageRole::User).map(|m| m.content.clone()).collect()
      })
      .unwrap_or_default()
  }

  pub fn last_attachments(&self) -> Vec<String> {
    self.state.lock().unwrap().attachments.last().cloned().unwrap_or_default()
  }
}

#[async_trait]
impl HostedAssistant for FakeAssistant {
  async fn create_thread(&self) -> Result<String, HostedServiceError> {
    let mut state = self.state.lock().unwrap();
    state.threads += 1;
    Ok(format!("thread_{}", state.threads))
  }

  async fn add_message(
    &self,
    thread_id: &str,
    content: &str,
    role: MessageRole,
    attachments: &[String],
  ) -> Result<String, HostedServiceError> {
    let mut state = self.state.lock().unwrap();
    state.attachments.push(attachments.to_vec());
    let messages = state.messages.entry(thread_id.to_string()).or_default();
    messages.push(ThreadMessage { role, content: content.to_string(), created_at: Utc::now() });
    Ok(format!("msg_{}", messages.len()))
  }

  async fn run(&self, _thread_id: &str, _assistant_id: &str) -> Result<String, HostedServiceError> {
    let mut state = self.state.lock().unwrap();
    state.runs += 1;
    Ok(format!("run_{}", state.runs))
  }

  async fn get_run_status(
    &self,
    _thread_id: &str,
    _run_id: &str,
  ) -> Result<RunState, HostedServiceError> {
    let mut statuses = self.statuses.lock().unwrap();
    let status = if statuses.len() > 1 {
      statuses.pop_front().unwrap_or(RunStatus::Completed)
    } else {
      statuses.front().copied().unwrap_or(RunStatus::Completed)
    };
    let last_error = match status {
      RunStatus::Failed | RunStatus::Expired => Some(format!("run {status}")),
      _ => None,
    };
    Ok(RunState { status, last_error })
  }

  async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, HostedServiceError> {
    let state = self.state.lock().unwrap();
    let mut messages = state.messages.get(thread_id).cloned().unwrap_or_default();
    let last_user = messages.iter().rev().find(|m| m.role == MessageRole::User).cloned();

    let reply = match &self.reply {
      Reply::Echo => last_user.map(|m| format!("From the documents: {}", m.content)),
      Reply::FileSearch => {
        let attached = state.attachments.last().cloned().unwrap_or_default();
        let quoted: Vec<String> = attached
          .iter()
          .filter_map(|id| self.files.as_ref()?.content(id))
          .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
          .collect();
        (!quoted.is_empty()).then(|| format!("From the documents: {}", quoted.join("\n")))
      }
      Reply::Fixed(text) => Some(text.clone()),
      Reply::Silent => None,
    };
    if let Some(content) = reply {
      messages.push(ThreadMessage {
        role: MessageRole::Assistant,
        content,
        created_at: Utc::now() + Duration::seconds(1),
      });
    }
    // Listing is newest first
    messages.reverse();
    Ok(messages)
  }
}

// Query log
// =========

pub struct FailingQueryLog;

#[async_trait]
impl QueryLog for FailingQueryLog {
  async fn record(&self, _entry: &QueryLogEntry) -> Result<(), QueryLogError> {
    Err(QueryLogError::Io(std::io::Error::other("disk full")))
  }

  async fn history(
    &self,
    _limit: usize,
    _user_id: Option<&str>,
  ) -> Result<Vec<QueryLogEntry>, QueryLogError> {
    Err(QueryLogError::Io(std::io::Error::other("disk full")))
  }

  async fn clear(&self, _user_id: Option<&str>) -> Result<usize, QueryLogError> {
    Err(QueryLogError::Io(std::io::Error::other("disk full")))
  }
}

pub fn temp_query_log() -> (TempDir, Arc<JsonlQueryLog>) {
  let dir = TempDir::new().unwrap();
  let log = JsonlQueryLog::new(dir.path().join("queries.jsonl")).unwrap();
  (dir, Arc::new(log))
}

// OCR
// ===

mock! {
  pub Ocr {}

  #[async_trait]
  impl OcrService for Ocr {
    async fn extract(
      &self,
      file_bytes: &[u8],
      filename: &str,
      language: &str,
    ) -> Result<OcrOutcome, OcrError>;
  }
}

pub fn ocr_text(text: &str) -> OcrOutcome {
  OcrOutcome {
    success: true,
    text: text.to_string(),
    confidence: Some(0.93),
    word_count: text.split_whitespace().count(),
    character_count: text.chars().count(),
    pages_processed: 1,
    error: None,
  }
}

// Wiring
// ======

pub fn ingestor(
  store: &VectorStore,
  files: &Arc<FakeFileStore>,
  ocr: Option<Arc<dyn OcrService>>,
) -> DocumentIngestor {
  DocumentIngestor::new(store.clone(), files.clone(), ocr, "eng")
}

pub fn fast_conversation() -> ConversationConfig {
  ConversationConfig { poll_interval_ms: 5, run_timeout_secs: 1 }
}

pub fn orchestrator(
  store: &VectorStore,
  files: &Arc<FakeFileStore>,
  assistant: &Arc<FakeAssistant>,
  query_log: Arc<dyn QueryLog>,
  retrieval: RetrievalConfig,
) -> ConversationOrchestrator {
  ConversationOrchestrator::new(
    store.clone(),
    files.clone(),
    assistant.clone(),
    query_log,
    "asst_test",
    retrieval,
    fast_conversation(),
  )
}

//! Conversation orchestration: retrieve context, ask the hosted assistant,
//! wait for its run, and record the exchange.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ConversationConfig, RetrievalConfig};
use crate::error::ConversationError;
use crate::models::{
  ContextSource, HostedFile, MessageRole, QueryAnswer, QueryLogEntry, RunState, RunStatus,
  ThreadMessage, VectorMatch,
};
use crate::query_log::QueryLog;
use crate::services::hosted::ASSISTANTS_PURPOSE;
use crate::services::{file_extension, HostedAssistant, HostedFileStore};
use crate::vector_store::VectorStore;

/// Hosted file types the assistant can search through
pub const ATTACHABLE_EXTENSIONS: &[&str] =
  &["txt", "pdf", "docx", "doc", "rtf", "md", "json", "csv", "xml", "html"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct QueryRequest {
  pub query: String,
  /// Continue an existing conversation thread
  #[serde(default)]
  pub thread_id: Option<String>,
  #[serde(default)]
  pub user_id: Option<String>,
}

pub struct ConversationOrchestrator {
  vector_store: VectorStore,
  hosted_files: Arc<dyn HostedFileStore>,
  assistant: Arc<dyn HostedAssistant>,
  query_log: Arc<dyn QueryLog>,
  assistant_id: String,
  retrieval: RetrievalConfig,
  conversation: ConversationConfig,
}

impl ConversationOrchestrator {
  pub fn new(
    vector_store: VectorStore,
    hosted_files: Arc<dyn HostedFileStore>,
    assistant: Arc<dyn HostedAssistant>,
    query_log: Arc<dyn QueryLog>,
    assistant_id: impl Into<String>,
    retrieval: RetrievalConfig,
    conversation: ConversationConfig,
  ) -> Self {
    Self {
      vector_store,
      hosted_files,
      assistant,
      query_log,
      assistant_id: assistant_id.into(),
      retrieval,
      conversation,
    }
  }

  pub fn query_log(&self) -> &Arc<dyn QueryLog> {
    &self.query_log
  }

  pub async fn answer(&self, request: QueryRequest) -> Result<QueryAnswer, ConversationError> {
    let query = request.query.trim();
    if query.is_empty() {
      return Err(ConversationError::EmptyQuery);
    }

    let matches =
      self.vector_store.search(query, self.retrieval.limit, self.retrieval.threshold).await?;
    let context = build_context(&matches, self.retrieval.snippet_chars);
    let mut sources: Vec<ContextSource> = matches.iter().map(ContextSource::vector).collect();
    debug!(matches = matches.len(), "retrieved vector context");

    let files = self.attachable_files().await;
    let attachments: Vec<String> = files.iter().map(|f| f.file_id.clone()).collect();

    let thread_id = match request.thread_id.filter(|id| !id.trim().is_empty()) {
      Some(id) => id,
      None => self.assistant.create_thread().await?,
    };

    let prompt = build_prompt(query, &context);
    self.assistant.add_message(&thread_id, &prompt, MessageRole::User, &attachments).await?;
    let run_id = self.assistant.run(&thread_id, &self.assistant_id).await?;
    info!(thread_id = %thread_id, run_id = %run_id, attachments = attachments.len(), "started assistant run");

    self.wait_for_run(&thread_id, &run_id).await?;

    let messages = self.assistant.list_messages(&thread_id).await?;
    let answer = latest_assistant_reply(messages)
      .ok_or_else(|| ConversationError::NoAnswer { thread_id: thread_id.clone() })?;

    let vector_source_count = sources.len();
    sources.extend(files.iter().map(ContextSource::hosted_file));

    let entry = QueryLogEntry::new(
      query,
      &answer,
      sources.clone(),
      request.user_id,
      Some(thread_id.clone()),
    );
    if let Err(e) = self.query_log.record(&entry).await {
      warn!(error = %e, "failed to record query log entry");
    }

    Ok(QueryAnswer {
      answer,
      thread_id,
      sources,
      vector_context_used: vector_source_count > 0,
      vector_source_count,
      attached_file_count: attachments.len(),
    })
  }

  /// Hosted files the assistant may search, most recent first
  async fn attachable_files(&self) -> Vec<HostedFile> {
    let files = match self.hosted_files.list(ASSISTANTS_PURPOSE).await {
      Ok(files) => files,
      Err(e) => {
        warn!(error = %e, "failed to list hosted files, continuing without attachments");
        return Vec::new();
      }
    };

    let mut attachable: Vec<HostedFile> = files
      .into_iter()
      .filter(|file| {
        let supported = file_extension(&file.filename)
          .is_some_and(|ext| ATTACHABLE_EXTENSIONS.contains(&ext.as_str()));
        if !supported {
          debug!(filename = %file.filename, "skipping hosted file with unsupported type");
        }
        supported
      })
      .collect();

    attachable.sort_by_key(|file| Reverse(file.created_at));
    attachable.truncate(self.retrieval.max_attached_files);
    attachable
  }

  /// Poll until the run reaches a terminal state or the deadline passes
  async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<(), ConversationError> {
    let started = Instant::now();
    let interval = self.conversation.poll_interval();

    let poll = async {
      loop {
        let state = self.assistant.get_run_status(thread_id, run_id).await?;
        if state.status.is_terminal() {
          return Ok::<RunState, ConversationError>(state);
        }
        debug!(run_id, status = %state.status, "run still pending");
        tokio::time::sleep(interval).await;
      }
    };

    let state = match tokio::time::timeout(self.conversation.run_timeout(), poll).await {
      Ok(result) => result?,
      Err(_) => {
        warn!(run_id, "assistant run did not finish in time");
        return Err(ConversationError::RunTimeout {
          run_id: run_id.to_string(),
          elapsed: started.elapsed(),
        });
      }
    };

    if state.status != RunStatus::Completed {
      warn!(run_id, status = %state.status, "assistant run did not complete");
      return Err(ConversationError::RunFailed {
        status: state.status,
        last_error: state.last_error,
      });
    }
    Ok(())
  }
}

/// Numbered context entries, one per match
pub fn build_context(matches: &[VectorMatch], snippet_chars: usize) -> String {
  matches
    .iter()
    .enumerate()
    .map(|(i, hit)| {
      let title = hit
        .metadata
        .title
        .as_deref()
        .or(hit.metadata.original_filename.as_deref())
        .unwrap_or(&hit.document_id);
      let category = hit.metadata.category.as_deref().unwrap_or("Uncategorized");
      format!("[{}] {} (Category: {})\n{}", i + 1, title, category, snippet(&hit.content, snippet_chars))
    })
    .collect::<Vec<_>>()
    .join("\n\n")
}

pub fn build_prompt(query: &str, context: &str) -> String {
  if context.is_empty() {
    return query.to_string();
  }
  format!(
    "Based on the following relevant information:\n\n{context}\n\nPlease answer: {query}\n\nIf the information above is relevant, use it; otherwise answer from general knowledge."
  )
}

fn snippet(content: &str, max_chars: usize) -> String {
  match content.char_indices().nth(max_chars) {
    Some((cut, _)) => format!("{}...", &content[..cut]),
    None => content.to_string(),
  }
}

/// Newest assistant message; the first one wins on equal timestamps
fn latest_assistant_reply(messages: Vec<ThreadMessage>) -> Option<String> {
  messages
    .into_iter()
    .filter(|m| m.role == MessageRole::Assistant)
    .min_by_key(|m| Reverse(m.created_at))
    .map(|m| m.content)
}

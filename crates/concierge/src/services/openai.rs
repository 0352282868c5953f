//! Hosted file store and assistant backed by the OpenAI Assistants API

use async_openai::{
  config::OpenAIConfig,
  error::OpenAIError,
  types::{
    CreateFileRequestArgs, CreateMessageRequest, CreateMessageRequestContent, CreateRunRequest,
    CreateThreadRequest, FileInput, FilePurpose, MessageAttachment, MessageAttachmentTool,
    MessageContent, MessageRole as OpenAiRole, RunStatus as OpenAiRunStatus,
  },
  Client,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::hosted::{HostedAssistant, HostedFileStore};
use crate::config::OpenAiConfig;
use crate::error::HostedServiceError;
use crate::models::{HostedFile, MessageRole, RunState, RunStatus, ThreadMessage};

/// Build the API client shared by the embedder and the assistant client
pub fn build_client(config: &OpenAiConfig) -> Client<OpenAIConfig> {
  let mut openai_config = OpenAIConfig::new();
  if let Some(key) = &config.api_key {
    openai_config = openai_config.with_api_key(key);
  }
  if let Some(base) = &config.api_base {
    openai_config = openai_config.with_api_base(base);
  }
  Client::with_config(openai_config)
}

pub struct OpenAiAssistantClient {
  client: Client<OpenAIConfig>,
}

impl OpenAiAssistantClient {
  pub fn new(client: Client<OpenAIConfig>) -> Self {
    Self { client }
  }
}

fn request_error(e: OpenAIError) -> HostedServiceError {
  HostedServiceError::Request { message: e.to_string() }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
  DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

fn file_purpose(purpose: &str) -> FilePurpose {
  match purpose {
    "batch" => FilePurpose::Batch,
    "fine-tune" => FilePurpose::FineTune,
    "vision" => FilePurpose::Vision,
    _ => FilePurpose::Assistants,
  }
}

fn run_status(status: OpenAiRunStatus) -> RunStatus {
  match status {
    OpenAiRunStatus::Queued => RunStatus::Queued,
    OpenAiRunStatus::InProgress => RunStatus::InProgress,
    OpenAiRunStatus::RequiresAction => RunStatus::RequiresAction,
    OpenAiRunStatus::Cancelling => RunStatus::Cancelling,
    OpenAiRunStatus::Cancelled => RunStatus::Cancelled,
    OpenAiRunStatus::Failed => RunStatus::Failed,
    OpenAiRunStatus::Completed => RunStatus::Completed,
    OpenAiRunStatus::Incomplete => RunStatus::Incomplete,
    OpenAiRunStatus::Expired => RunStatus::Expired,
  }
}

#[async_trait]
impl HostedFileStore for OpenAiAssistantClient {
  async fn upload(
    &self,
    bytes: Vec<u8>,
    filename: &str,
    purpose: &str,
  ) -> Result<String, HostedServiceError> {
    let request = CreateFileRequestArgs::default()
      .file(FileInput::from_vec_u8(filename.to_string(), bytes))
      .purpose(file_purpose(purpose))
      .build()
      .map_err(request_error)?;

    let file = self.client.files().create(request).await.map_err(request_error)?;
    debug!(file_id = %file.id, filename, "uploaded file to hosted store");
    Ok(file.id)
  }

  async fn list(&self, purpose: &str) -> Result<Vec<HostedFile>, HostedServiceError> {
    let response =
      self.client.files().list(&[("purpose", purpose)]).await.map_err(request_error)?;

    Ok(
      response
        .data
        .into_iter()
        .map(|file| HostedFile {
          file_id: file.id,
          filename: file.filename,
          bytes: u64::from(file.bytes),
          created_at: timestamp(i64::from(file.created_at)),
        })
        .collect(),
    )
  }

  async fn delete(&self, file_id: &str) -> Result<bool, HostedServiceError> {
    let response = self.client.files().delete(file_id).await.map_err(request_error)?;
    Ok(response.deleted)
  }
}

#[async_trait]
impl HostedAssistant for OpenAiAssistantClient {
  async fn create_thread(&self) -> Result<String, HostedServiceError> {
    let thread =
      self.client.threads().create(CreateThreadRequest::default()).await.map_err(request_error)?;
    Ok(thread.id)
  }

  async fn add_message(
    &self,
    thread_id: &str,
    content: &str,
    role: MessageRole,
    attachments: &[String],
  ) -> Result<String, HostedServiceError> {
    let attachments = (!attachments.is_empty()).then(|| {
      attachments
        .iter()
        .map(|file_id| MessageAttachment {
          file_id: file_id.clone(),
          tools: vec![MessageAttachmentTool::FileSearch],
        })
        .collect()
    });

    let request = CreateMessageRequest {
      role: match role {
        MessageRole::User => OpenAiRole::User,
        MessageRole::Assistant => OpenAiRole::Assistant,
      },
      content: CreateMessageRequestContent::Content(content.to_string()),
      attachments,
      ..Default::default()
    };

    let message = self
      .client
      .threads()
      .messages(thread_id)
      .create(request)
      .await
      .map_err(request_error)?;
    Ok(message.id)
  }

  async fn run(&self, thread_id: &str, assistant_id: &str) -> Result<String, HostedServiceError> {
    let run = self
      .client
      .threads()
      .runs(thread_id)
      .create(CreateRunRequest { assistant_id: assistant_id.to_string(), ..Default::default() })
      .await
      .map_err(request_error)?;
    Ok(run.id)
  }

  async fn get_run_status(
    &self,
    thread_id: &str,
    run_id: &str,
  ) -> Result<RunState, HostedServiceError> {
    let run =
      self.client.threads().runs(thread_id).retrieve(run_id).await.map_err(request_error)?;

    Ok(RunState {
      status: run_status(run.status),
      last_error: run.last_error.map(|e| e.message),
    })
  }

  async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, HostedServiceError> {
    let response = self
      .client
      .threads()
      .messages(thread_id)
      .list(&[("order", "desc"), ("limit", "20")])
      .await
      .map_err(request_error)?;

    Ok(
      response
        .data
        .into_iter()
        .map(|message| {
          let content = message
            .content
            .iter()
            .filter_map(|part| match part {
              MessageContent::Text(text) => Some(text.text.value.as_str()),
              _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

          ThreadMessage {
            role: match message.role {
              OpenAiRole::User => MessageRole::User,
              OpenAiRole::Assistant => MessageRole::Assistant,
            },
            content,
            created_at: timestamp(i64::from(message.created_at)),
          }
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_run_status_mapping() {
    assert_eq!(run_status(OpenAiRunStatus::Expired), RunStatus::Expired);
    assert_eq!(run_status(OpenAiRunStatus::Completed), RunStatus::Completed);
    assert_eq!(run_status(OpenAiRunStatus::RequiresAction), RunStatus::RequiresAction);
  }

  #[test]
  fn test_unknown_purpose_defaults_to_assistants() {
    assert!(matches!(file_purpose("assistants"), FilePurpose::Assistants));
    assert!(matches!(file_purpose("something-else"), FilePurpose::Assistants));
    assert!(matches!(file_purpose("batch"), FilePurpose::Batch));
  }
}

//! Hosted file store and hosted assistant interfaces

use async_trait::async_trait;

use crate::error::HostedServiceError;
use crate::models::{HostedFile, MessageRole, RunState, ThreadMessage};

/// Purpose tag the assistant service expects on uploaded files
pub const ASSISTANTS_PURPOSE: &str = "assistants";

#[async_trait]
pub trait HostedFileStore: Send + Sync {
  async fn upload(
    &self,
    bytes: Vec<u8>,
    filename: &str,
    purpose: &str,
  ) -> Result<String, HostedServiceError>;

  async fn list(&self, purpose: &str) -> Result<Vec<HostedFile>, HostedServiceError>;

  async fn delete(&self, file_id: &str) -> Result<bool, HostedServiceError>;
}

#[async_trait]
pub trait HostedAssistant: Send + Sync {
  async fn create_thread(&self) -> Result<String, HostedServiceError>;

  /// Post a message, attaching `attachments` (file ids) for retrieval
  async fn add_message(
    &self,
    thread_id: &str,
    content: &str,
    role: MessageRole,
    attachments: &[String],
  ) -> Result<String, HostedServiceError>;

  /// Start a run and return its id
  async fn run(&self, thread_id: &str, assistant_id: &str) -> Result<String, HostedServiceError>;

  async fn get_run_status(
    &self,
    thread_id: &str,
    run_id: &str,
  ) -> Result<RunState, HostedServiceError>;

  async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, HostedServiceError>;
}

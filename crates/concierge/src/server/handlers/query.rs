//! Question answering endpoint

use axum::extract::{Json, State};
use axum::http::StatusCode;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::QueryRequest;
use crate::error::ConversationError;
use crate::models::QueryAnswer;
use crate::server::state::AppState;
use crate::server::types::{ApiError, ApiFailure, ApiResult, BaseResponse};

/// POST /query - Answer a question using stored documents as context
pub async fn answer_query(
  State(state): State<AppState>,
  Json(request): Json<QueryRequest>,
) -> ApiResult<QueryAnswer> {
  let transaction_id = Uuid::new_v4();

  match state.conversation.answer(request).await {
    Ok(answer) => {
      info!(
        %transaction_id,
        thread_id = %answer.thread_id,
        vector_sources = answer.vector_source_count,
        attached_files = answer.attached_file_count,
        "query answered"
      );
      Ok(Json(BaseResponse::success(answer, transaction_id)))
    }
    Err(e) => {
      warn!(%transaction_id, error = %e, "query failed");
      Err(failure_for(&e, transaction_id))
    }
  }
}

/// Map an orchestration error onto a status code and error envelope
pub fn failure_for(error: &ConversationError, transaction_id: Uuid) -> ApiFailure {
  let message = error.to_string();
  let (status, api_error) = match error {
    ConversationError::EmptyQuery => {
      (StatusCode::BAD_REQUEST, ApiError::new("empty_query", &message))
    }
    ConversationError::Embedding(_) => {
      (StatusCode::SERVICE_UNAVAILABLE, ApiError::new("embedding_unavailable", &message))
    }
    ConversationError::Hosted(_) => {
      (StatusCode::BAD_GATEWAY, ApiError::new("assistant_service_error", &message))
    }
    ConversationError::RunFailed { status, last_error } => (
      StatusCode::BAD_GATEWAY,
      ApiError::new("run_failed", &message)
        .with_context(json!({ "status": status, "last_error": last_error })),
    ),
    ConversationError::RunTimeout { run_id, elapsed } => (
      StatusCode::GATEWAY_TIMEOUT,
      ApiError::new("run_timeout", &message)
        .with_context(json!({ "run_id": run_id, "elapsed_ms": elapsed.as_millis() as u64 })),
    ),
    ConversationError::NoAnswer { thread_id } => (
      StatusCode::BAD_GATEWAY,
      ApiError::new("no_answer", &message).with_context(json!({ "thread_id": thread_id })),
    ),
  };

  api_error.into_failure(status, transaction_id)
}

//! Query history endpoints

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::server::state::AppState;
use crate::server::types::{
  ApiError, ApiResult, BaseResponse, ClearHistoryParams, ClearHistoryResponse, HistoryParams,
  QueryHistoryResponse,
};

const DEFAULT_HISTORY_LIMIT: usize = 20;

/// GET /queries - Recent questions and answers, newest first
pub async fn query_history(
  State(state): State<AppState>,
  Query(params): Query<HistoryParams>,
) -> ApiResult<QueryHistoryResponse> {
  let transaction_id = Uuid::new_v4();
  let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

  match state.query_log.history(limit, params.user_id.as_deref()).await {
    Ok(queries) => {
      let count = queries.len();
      Ok(Json(BaseResponse::success(QueryHistoryResponse { queries, count }, transaction_id)))
    }
    Err(e) => {
      warn!(%transaction_id, error = %e, "failed to read query history");
      Err(
        ApiError::new("history_unavailable", &e.to_string())
          .into_failure(StatusCode::INTERNAL_SERVER_ERROR, transaction_id),
      )
    }
  }
}

/// DELETE /queries - Clear history for one user, or everyone
pub async fn clear_history(
  State(state): State<AppState>,
  Query(params): Query<ClearHistoryParams>,
) -> ApiResult<ClearHistoryResponse> {
  let transaction_id = Uuid::new_v4();

  match state.query_log.clear(params.user_id.as_deref()).await {
    Ok(removed) => {
      info!(%transaction_id, removed, user_id = ?params.user_id, "cleared query history");
      Ok(Json(BaseResponse::success(ClearHistoryResponse { removed }, transaction_id)))
    }
    Err(e) => {
      warn!(%transaction_id, error = %e, "failed to clear query history");
      Err(
        ApiError::new("history_clear_failed", &e.to_string())
          .into_failure(StatusCode::INTERNAL_SERVER_ERROR, transaction_id),
      )
    }
  }
}

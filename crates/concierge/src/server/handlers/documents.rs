//! Document endpoint handlers

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::IngestError;
use crate::ingest::IngestRequest;
use crate::models::{IngestionResult, RemovalResult};
use crate::server::state::AppState;
use crate::server::types::{
  ApiError, ApiResult, BaseResponse, DocumentResponse, ListDocumentsParams,
  ListDocumentsResponse,
};

const DEFAULT_LIST_LIMIT: usize = 50;
const DEFAULT_CATEGORY: &str = "General";

/// POST /documents - Upload and ingest a document (multipart form)
pub async fn upload_document(
  State(state): State<AppState>,
  multipart: Multipart,
) -> ApiResult<IngestionResult> {
  let transaction_id = Uuid::new_v4();

  let request = read_upload(multipart).await.map_err(|e| {
    ApiError::new("invalid_upload", &e).into_failure(StatusCode::BAD_REQUEST, transaction_id)
  })?;

  match state.ingestor.ingest(request).await {
    Ok(result) => {
      info!(
        %transaction_id,
        vector_document_id = %result.vector_document_id,
        searchable = result.searchable,
        "document ingested"
      );
      Ok(Json(BaseResponse::success(result, transaction_id)))
    }
    Err(IngestError::InvalidUpload { reason }) => Err(
      ApiError::new("invalid_upload", &reason).into_failure(StatusCode::BAD_REQUEST, transaction_id),
    ),
    Err(e @ IngestError::HostedUpload(_)) => {
      warn!(%transaction_id, error = %e, "document ingestion failed");
      Err(
        ApiError::new("hosted_upload_failed", &e.to_string())
          .into_failure(StatusCode::BAD_GATEWAY, transaction_id),
      )
    }
  }
}

/// GET /documents - Most recently stored documents
pub async fn list_documents(
  State(state): State<AppState>,
  Query(params): Query<ListDocumentsParams>,
) -> Json<BaseResponse<ListDocumentsResponse>> {
  let transaction_id = Uuid::new_v4();
  let documents: Vec<_> = state
    .vector_store
    .list(params.limit.unwrap_or(DEFAULT_LIST_LIMIT))
    .await
    .into_iter()
    .map(Into::into)
    .collect();

  let count = documents.len();
  Json(BaseResponse::success(ListDocumentsResponse { documents, count }, transaction_id))
}

/// GET /documents/{id} - One stored document
pub async fn get_document(
  State(state): State<AppState>,
  Path(document_id): Path<String>,
) -> ApiResult<DocumentResponse> {
  let transaction_id = Uuid::new_v4();

  match state.vector_store.get(&document_id).await {
    Some(record) => {
      Ok(Json(BaseResponse::success(DocumentResponse { document: record.into() }, transaction_id)))
    }
    None => Err(
      ApiError::new("document_not_found", &format!("Document not found: {document_id}"))
        .into_failure(StatusCode::NOT_FOUND, transaction_id),
    ),
  }
}

/// DELETE /documents/{id} - Remove a document from both stores
pub async fn delete_document(
  State(state): State<AppState>,
  Path(document_id): Path<String>,
) -> Json<BaseResponse<RemovalResult>> {
  let transaction_id = Uuid::new_v4();
  let result = state.ingestor.remove(&document_id).await;
  info!(
    %transaction_id,
    vector_document_id = %document_id,
    vector_deleted = result.vector_deleted,
    hosted_file_deleted = result.hosted_file_deleted,
    "document removal finished"
  );

  Json(BaseResponse::success(result, transaction_id))
}

async fn read_upload(mut multipart: Multipart) -> Result<IngestRequest, String> {
  let mut file: Option<(String, Vec<u8>)> = None;
  let mut title = None;
  let mut description = None;
  let mut category = None;
  let mut document_id = None;

  while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      "file" => {
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| e.to_string())?;
        file = Some((filename, bytes.to_vec()));
      }
      "title" => title = Some(field.text().await.map_err(|e| e.to_string())?),
      "description" => description = Some(field.text().await.map_err(|e| e.to_string())?),
      "category" => category = Some(field.text().await.map_err(|e| e.to_string())?),
      "document_id" => document_id = Some(field.text().await.map_err(|e| e.to_string())?),
      _ => {}
    }
  }

  let (filename, file_bytes) = file.ok_or_else(|| "missing 'file' field".to_string())?;
  let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

  Ok(IngestRequest {
    title: non_empty(title).unwrap_or_else(|| filename.clone()),
    description: description.unwrap_or_default(),
    category: non_empty(category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    document_id: non_empty(document_id),
    filename,
    file_bytes,
  })
}

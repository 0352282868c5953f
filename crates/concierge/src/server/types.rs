//! REST API types with schemars annotations for OpenAPI generation

use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DocumentMetadata, EmbeddingRecord, QueryLogEntry};

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  /// The latest version of the API
  pub latest: String,

  /// The version of the API requested by the client
  pub requested: String,

  /// The version of the API that was used in producing the response
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Error stack trace (if available)
  #[serde(default)]
  pub stack: Vec<String>,

  /// Additional error context
  #[serde(default)]
  pub context: serde_json::Value,
}

/// Error half of every handler result
pub type ApiFailure = (StatusCode, Json<BaseResponse<()>>);

pub type ApiResult<T> = Result<Json<BaseResponse<T>>, ApiFailure>;

// Status/Version Endpoints
// =======================

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  /// Current API version
  pub version: String,
}

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  /// `postgres` or `memory`
  pub vector_backend: String,
  pub document_count: usize,
}

// Document Endpoints
// ==================

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListDocumentsParams {
  #[serde(default)]
  pub limit: Option<usize>,
}

/// A stored document without its embedding vector
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSummary {
  pub document_id: String,
  pub content: String,
  pub metadata: DocumentMetadata,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<EmbeddingRecord> for DocumentSummary {
  fn from(record: EmbeddingRecord) -> Self {
    Self {
      document_id: record.document_id,
      content: record.content,
      metadata: record.metadata,
      created_at: record.created_at,
      updated_at: record.updated_at,
    }
  }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListDocumentsResponse {
  pub documents: Vec<DocumentSummary>,
  pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DocumentResponse {
  pub document: DocumentSummary,
}

// Query History Endpoints
// =======================

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct HistoryParams {
  #[serde(default)]
  pub limit: Option<usize>,
  #[serde(default)]
  pub user_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClearHistoryParams {
  #[serde(default)]
  pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryHistoryResponse {
  pub queries: Vec<QueryLogEntry>,
  pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ClearHistoryResponse {
  pub removed: usize,
}

// Helper Functions
// ================

fn version_info() -> VersionInfo {
  let version = env!("CARGO_PKG_VERSION");
  VersionInfo {
    latest: version.to_string(),
    requested: version.to_string(),
    resolved: version.to_string(),
  }
}

impl<T> BaseResponse<T> {
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: version_info(), transaction_id, errors: Vec::new(), data }
  }

  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: version_info(), transaction_id, errors, data: () }
  }
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self {
      key: key.to_string(),
      message: message.to_string(),
      stack: Vec::new(),
      context: serde_json::Value::Null,
    }
  }

  pub fn with_context(mut self, context: serde_json::Value) -> Self {
    self.context = context;
    self
  }

  /// Wrap this error in an envelope with the given status
  pub fn into_failure(self, status: StatusCode, transaction_id: Uuid) -> ApiFailure {
    (status, Json(BaseResponse::<()>::error(vec![self], transaction_id)))
  }
}

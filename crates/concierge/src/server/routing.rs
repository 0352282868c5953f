//! Axum router configuration for all endpoints

use axum::{
  extract::DefaultBodyLimit,
  routing::{get, post},
  Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::server::handlers::{documents, history, query, status};
use crate::server::state::AppState;

/// Largest accepted document upload
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    // Documents
    .route(
      "/documents",
      post(documents::upload_document)
        .get(documents::list_documents)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
    .route("/documents/{id}", get(documents::get_document).delete(documents::delete_document))
    // Questions and their history
    .route("/query", post(query::answer_query))
    .route("/queries", get(history::query_history).delete(history::clear_history))
    .with_state(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
}

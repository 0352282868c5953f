//! REST API for document upload, question answering and query history
//!
//! Uses axum for routing and schemars for OpenAPI documentation generation.

pub mod handlers;
pub mod routing;
pub mod startup;
pub mod state;
pub mod types;

pub use routing::create_router;
pub use state::AppState;

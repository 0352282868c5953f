//! Concierge - Retrieval-Augmented Question Answering
//!
//! Ingests facility documents (with OCR for scans), indexes them as vector
//! embeddings in PostgreSQL/pgvector, and answers questions through a hosted
//! assistant grounded in the most similar stored documents.

pub mod config;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod query_log;
pub mod server;
pub mod services;
pub mod telemetry;
pub mod vector_store;

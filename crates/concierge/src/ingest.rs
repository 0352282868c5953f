//! Document ingestion: OCR, content enrichment and the dual write to the
//! hosted file store and the vector store.
//!
//! The hosted upload is the only step that can fail an ingestion. OCR and
//! vector indexing degrade; their outcome is reported through
//! `IngestionResult::ocr` and `IngestionResult::searchable`.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::IngestError;
use crate::models::{DocumentMetadata, IngestionResult, OcrMetadata, RemovalResult};
use crate::services::hosted::ASSISTANTS_PURPOSE;
use crate::services::ocr::is_ocr_supported;
use crate::services::{HostedFileStore, OcrService};
use crate::vector_store::VectorStore;

const CONTENT_SEPARATOR: &str = "--- EXTRACTED CONTENT ---";

/// One uploaded document plus its descriptive fields
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
  pub file_bytes: Vec<u8>,
  pub filename: String,
  pub title: String,
  pub description: String,
  pub category: String,
  /// Caller-chosen id; a UUID v4 is generated when absent
  pub document_id: Option<String>,
}

pub struct DocumentIngestor {
  vector_store: VectorStore,
  hosted_files: Arc<dyn HostedFileStore>,
  ocr: Option<Arc<dyn OcrService>>,
  ocr_language: String,
}

impl DocumentIngestor {
  pub fn new(
    vector_store: VectorStore,
    hosted_files: Arc<dyn HostedFileStore>,
    ocr: Option<Arc<dyn OcrService>>,
    ocr_language: impl Into<String>,
  ) -> Self {
    Self { vector_store, hosted_files, ocr, ocr_language: ocr_language.into() }
  }

  pub async fn ingest(&self, request: IngestRequest) -> Result<IngestionResult, IngestError> {
    if request.filename.trim().is_empty() {
      return Err(IngestError::InvalidUpload { reason: "filename is empty".to_string() });
    }
    if request.file_bytes.is_empty() {
      return Err(IngestError::InvalidUpload {
        reason: format!("'{}' has no content", request.filename),
      });
    }

    let document_id = request
      .document_id
      .clone()
      .filter(|id| !id.trim().is_empty())
      .unwrap_or_else(|| Uuid::new_v4().to_string());
    let uploaded_at = Utc::now();

    let (body_text, ocr) = self.extract_text(&request).await;
    let content = compose_content(
      &request.filename,
      &request.title,
      &request.description,
      &request.category,
      &body_text,
    );

    let (upload_bytes, upload_name) = if body_text.trim().is_empty() {
      (request.file_bytes.clone(), request.filename.clone())
    } else {
      (content.clone().into_bytes(), enriched_filename(&request.filename))
    };

    let external_file_id = self
      .hosted_files
      .upload(upload_bytes, &upload_name, ASSISTANTS_PURPOSE)
      .await
      .map_err(IngestError::HostedUpload)?;
    info!(document_id = %document_id, external_file_id = %external_file_id, filename = %upload_name, "uploaded document to hosted file store");

    let vector_document_id = vector_document_id(&document_id, &external_file_id);
    let metadata = DocumentMetadata {
      title: Some(request.title.clone()),
      description: Some(request.description.clone()),
      category: Some(request.category.clone()),
      original_filename: Some(request.filename.clone()),
      external_file_id: Some(external_file_id.clone()),
      ocr_processed: ocr.ocr_processed,
      text_extracted: ocr.text_extracted,
      ocr_confidence: ocr.confidence,
      uploaded_at: Some(uploaded_at),
      ..Default::default()
    };

    let vector_stored = self.vector_store.upsert(&vector_document_id, &content, &metadata).await;
    if !vector_stored {
      warn!(
        vector_document_id = %vector_document_id,
        external_file_id = %external_file_id,
        "document uploaded but not searchable"
      );
    }

    Ok(IngestionResult {
      document_id,
      vector_document_id,
      filename: request.filename,
      title: request.title,
      category: request.category,
      ocr,
      external_file_id,
      vector_stored,
      searchable: vector_stored,
      uploaded_at,
    })
  }

  /// Delete a document from the vector store and the hosted file store.
  /// The two deletions are independent; each outcome is reported.
  pub async fn remove(&self, vector_document_id: &str) -> RemovalResult {
    let external_file_id = match self.vector_store.get(vector_document_id).await {
      Some(record) => record.metadata.external_file_id,
      None => None,
    }
    .or_else(|| parse_external_file_id(vector_document_id));

    let vector_deleted = self.vector_store.delete(vector_document_id).await;

    let hosted_file_deleted = match &external_file_id {
      Some(file_id) => match self.hosted_files.delete(file_id).await {
        Ok(deleted) => deleted,
        Err(e) => {
          warn!(file_id = %file_id, error = %e, "failed to delete hosted file");
          false
        }
      },
      None => {
        debug!(vector_document_id, "no hosted file id known for document");
        false
      }
    };

    RemovalResult {
      vector_document_id: vector_document_id.to_string(),
      vector_deleted,
      external_file_id,
      hosted_file_deleted,
    }
  }

  async fn extract_text(&self, request: &IngestRequest) -> (String, OcrMetadata) {
    if !is_ocr_supported(&request.filename) {
      debug!(filename = %request.filename, "file type not supported by OCR");
      return (String::new(), OcrMetadata::default());
    }

    let Some(ocr) = &self.ocr else {
      debug!(filename = %request.filename, "no OCR service configured");
      return (String::new(), OcrMetadata::default());
    };

    match ocr.extract(&request.file_bytes, &request.filename, &self.ocr_language).await {
      Ok(outcome) if outcome.success => {
        let metadata = OcrMetadata {
          ocr_processed: true,
          text_extracted: !outcome.text.trim().is_empty(),
          confidence: outcome.confidence,
          character_count: outcome.character_count,
          word_count: outcome.word_count,
          pages_processed: outcome.pages_processed,
          error: None,
        };
        info!(filename = %request.filename, characters = outcome.character_count, "OCR extracted text");
        (outcome.text, metadata)
      }
      Ok(outcome) => {
        let error = outcome.error.unwrap_or_else(|| "OCR reported failure".to_string());
        warn!(filename = %request.filename, error = %error, "OCR failed, continuing without text");
        (String::new(), OcrMetadata { error: Some(error), ..Default::default() })
      }
      Err(e) => {
        warn!(filename = %request.filename, error = %e, "OCR failed, continuing without text");
        (String::new(), OcrMetadata { error: Some(e.to_string()), ..Default::default() })
      }
    }
  }
}

/// Text that gets embedded and, when there is body text, uploaded
pub fn compose_content(
  filename: &str,
  title: &str,
  description: &str,
  category: &str,
  body_text: &str,
) -> String {
  let header = format!(
    "Document: {filename}\nTitle: {title}\nDescription: {description}\nCategory: {category}"
  );
  if body_text.trim().is_empty() {
    header
  } else {
    format!("{header}\n\n{CONTENT_SEPARATOR}\n\n{body_text}")
  }
}

pub fn vector_document_id(document_id: &str, external_file_id: &str) -> String {
  format!("doc_{document_id}_{external_file_id}")
}

/// Recover the hosted file id from a derived vector document id.
/// Hosted ids carry a `file-` prefix, which never appears in a UUID.
pub fn parse_external_file_id(vector_document_id: &str) -> Option<String> {
  let rest = vector_document_id.strip_prefix("doc_")?;
  let start = rest.rfind("_file-")?;
  Some(rest[start + 1..].to_string())
}

fn enriched_filename(filename: &str) -> String {
  let stem = Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
  format!("{stem}_enriched.txt")
}

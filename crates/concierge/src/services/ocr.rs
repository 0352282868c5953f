//! OCR collaborator: text extraction from scanned documents and images

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::file_extension;
use crate::error::OcrError;
use crate::models::OcrOutcome;

/// Extensions the OCR service can read
pub const OCR_SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "bmp", "tiff", "gif"];

pub fn is_ocr_supported(filename: &str) -> bool {
  file_extension(filename).is_some_and(|ext| OCR_SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

#[async_trait]
pub trait OcrService: Send + Sync {
  async fn extract(
    &self,
    file_bytes: &[u8],
    filename: &str,
    language: &str,
  ) -> Result<OcrOutcome, OcrError>;
}

/// OCR service reached over HTTP (multipart upload, JSON reply)
pub struct HttpOcrClient {
  client: Client,
  endpoint: String,
}

impl HttpOcrClient {
  pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, OcrError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| OcrError::Request { message: format!("Failed to create HTTP client: {e}") })?;

    Ok(Self { client, endpoint: endpoint.trim_end_matches('/').to_string() })
  }
}

#[async_trait]
impl OcrService for HttpOcrClient {
  async fn extract(
    &self,
    file_bytes: &[u8],
    filename: &str,
    language: &str,
  ) -> Result<OcrOutcome, OcrError> {
    if !is_ocr_supported(filename) {
      return Err(OcrError::UnsupportedFormat {
        extension: file_extension(filename).unwrap_or_default(),
      });
    }

    let part = Part::bytes(file_bytes.to_vec()).file_name(filename.to_string());
    let form = Form::new().part("file", part).text("language", language.to_string());

    let url = format!("{}/extract", self.endpoint);
    debug!(filename, bytes = file_bytes.len(), "sending document to OCR");
    let response = self
      .client
      .post(&url)
      .multipart(form)
      .send()
      .await
      .map_err(|e| OcrError::Request { message: e.to_string() })?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(OcrError::Service { message: format!("{status}: {body}") });
    }

    response.json::<OcrOutcome>().await.map_err(|e| OcrError::Service {
      message: format!("Invalid OCR response: {e}"),
    })
  }
}

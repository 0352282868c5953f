//! External collaborators: OCR, hosted file store, hosted assistant

pub mod hosted;
pub mod ocr;
pub mod openai;

pub use hosted::{HostedAssistant, HostedFileStore};
pub use ocr::{HttpOcrClient, OcrService};
pub use openai::OpenAiAssistantClient;

/// Lower-cased extension of `filename`, if it has one
pub fn file_extension(filename: &str) -> Option<String> {
  std::path::Path::new(filename)
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| ext.to_ascii_lowercase())
}

//! Configuration management for Concierge
//!
//! Settings come from a YAML file (first match of an explicit path,
//! `$CONCIERGE_CONFIG`, `./concierge.yaml`, `~/.concierge/config.yaml`),
//! fall back to defaults, and are then overridden by environment variables
//! for secrets and connection strings.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub openai: OpenAiConfig,
  #[serde(default)]
  pub database: DatabaseConfig,
  #[serde(default)]
  pub ocr: OcrConfig,
  #[serde(default)]
  pub retrieval: RetrievalConfig,
  #[serde(default)]
  pub conversation: ConversationConfig,
  #[serde(default)]
  pub query_log: QueryLogConfig,
  #[serde(default)]
  pub server: ServerConfig,
}

/// Hosted assistant, file store and embedding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
  /// API key; usually supplied through `OPENAI_API_KEY`
  #[serde(default, skip_serializing)]
  pub api_key: Option<String>,
  #[serde(default)]
  pub api_base: Option<String>,
  #[serde(default = "default_embedding_model")]
  pub embedding_model: String,
  #[serde(default = "default_embedding_dimension")]
  pub embedding_dimension: usize,
  /// Longest text (in characters) sent to the embedding endpoint
  #[serde(default = "default_max_input_chars")]
  pub max_input_chars: usize,
  #[serde(default)]
  pub assistant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
  /// PostgreSQL URL; without one the server keeps vectors in memory
  #[serde(default, skip_serializing)]
  pub url: Option<String>,
  #[serde(default = "default_max_connections")]
  pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
  /// Extraction endpoint; OCR is skipped entirely when unset
  #[serde(default)]
  pub endpoint: Option<String>,
  #[serde(default = "default_ocr_language")]
  pub language: String,
  #[serde(default = "default_ocr_timeout_secs")]
  pub timeout_secs: u64,
}

/// Similarity search parameters used when answering a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
  #[serde(default = "default_retrieval_limit")]
  pub limit: usize,
  #[serde(default = "default_retrieval_threshold")]
  pub threshold: f32,
  #[serde(default = "default_snippet_chars")]
  pub snippet_chars: usize,
  #[serde(default = "default_max_attached_files")]
  pub max_attached_files: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
  /// Upper bound on waiting for a single run
  #[serde(default = "default_run_timeout_secs")]
  pub run_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogConfig {
  /// JSONL file used when no database is configured
  #[serde(default = "default_query_log_path")]
  pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
}

fn default_embedding_model() -> String {
  "text-embedding-3-small".to_string()
}
fn default_embedding_dimension() -> usize {
  1536
}
fn default_max_input_chars() -> usize {
  8000
}
fn default_max_connections() -> u32 {
  5
}
fn default_ocr_language() -> String {
  "eng".to_string()
}
fn default_ocr_timeout_secs() -> u64 {
  120
}
fn default_retrieval_limit() -> usize {
  5
}
fn default_retrieval_threshold() -> f32 {
  0.6
}
fn default_snippet_chars() -> usize {
  500
}
fn default_max_attached_files() -> usize {
  10
}
fn default_poll_interval_ms() -> u64 {
  1000
}
fn default_run_timeout_secs() -> u64 {
  120
}
fn default_query_log_path() -> PathBuf {
  concierge_home().join("query_log.jsonl")
}
fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 3000))
}

impl Default for OpenAiConfig {
  fn default() -> Self {
    Self {
      api_key: None,
      api_base: None,
      embedding_model: default_embedding_model(),
      embedding_dimension: default_embedding_dimension(),
      max_input_chars: default_max_input_chars(),
      assistant_id: None,
    }
  }
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self { url: None, max_connections: default_max_connections() }
  }
}

impl Default for OcrConfig {
  fn default() -> Self {
    Self {
      endpoint: None,
      language: default_ocr_language(),
      timeout_secs: default_ocr_timeout_secs(),
    }
  }
}

impl Default for RetrievalConfig {
  fn default() -> Self {
    Self {
      limit: default_retrieval_limit(),
      threshold: default_retrieval_threshold(),
      snippet_chars: default_snippet_chars(),
      max_attached_files: default_max_attached_files(),
    }
  }
}

impl Default for ConversationConfig {
  fn default() -> Self {
    Self {
      poll_interval_ms: default_poll_interval_ms(),
      run_timeout_secs: default_run_timeout_secs(),
    }
  }
}

impl ConversationConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub fn run_timeout(&self) -> Duration {
    Duration::from_secs(self.run_timeout_secs)
  }
}

impl Default for QueryLogConfig {
  fn default() -> Self {
    Self { path: default_query_log_path() }
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { bind: default_bind() }
  }
}

impl Config {
  /// Load configuration from a YAML file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: display.clone(), source })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse { path: display, source })
  }

  /// Load from the first config file found (or defaults), then apply env overrides
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let mut config = match explicit {
      Some(path) => Self::load_from_file(path)?,
      None => match candidate_paths().into_iter().find(|p| p.exists()) {
        Some(path) => Self::load_from_file(path)?,
        None => Config::default(),
      },
    };

    config.apply_env_overrides();
    Ok(config)
  }

  /// Override secrets and endpoints from the process environment
  pub fn apply_env_overrides(&mut self) {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
      self.openai.api_key = Some(key);
    }
    if let Ok(id) = std::env::var("OPENAI_ASSISTANT_ID") {
      self.openai.assistant_id = Some(id);
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
      self.database.url = Some(url);
    }
    if let Ok(endpoint) = std::env::var("CONCIERGE_OCR_URL") {
      self.ocr.endpoint = Some(endpoint);
    }
  }

  /// Reject settings the pipeline cannot run with
  pub fn validate(&self, serving: bool) -> Result<(), ConfigError> {
    if self.openai.embedding_dimension == 0 {
      return Err(ConfigError::Invalid("openai.embedding_dimension must be positive".into()));
    }
    if self.openai.max_input_chars == 0 {
      return Err(ConfigError::Invalid("openai.max_input_chars must be positive".into()));
    }
    if !(-1.0..=1.0).contains(&self.retrieval.threshold) {
      return Err(ConfigError::Invalid(format!(
        "retrieval.threshold must be within [-1, 1], got {}",
        self.retrieval.threshold
      )));
    }
    if self.conversation.poll_interval_ms == 0 {
      return Err(ConfigError::Invalid("conversation.poll_interval_ms must be positive".into()));
    }
    if self.conversation.run_timeout_secs == 0 {
      return Err(ConfigError::Invalid("conversation.run_timeout_secs must be positive".into()));
    }
    if serving && self.openai.assistant_id.is_none() {
      return Err(ConfigError::Invalid(
        "openai.assistant_id (or OPENAI_ASSISTANT_ID) is required to answer queries".into(),
      ));
    }
    Ok(())
  }
}

/// Base directory for local state
pub fn concierge_home() -> PathBuf {
  if let Ok(dir) = std::env::var("CONCIERGE_HOME") {
    return PathBuf::from(dir);
  }
  dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join(".concierge")
}

fn candidate_paths() -> Vec<PathBuf> {
  let mut paths = Vec::new();
  if let Ok(path) = std::env::var("CONCIERGE_CONFIG") {
    paths.push(PathBuf::from(path));
  }
  paths.push(PathBuf::from("concierge.yaml"));
  paths.push(concierge_home().join("config.yaml"));
  paths
}

//! Query log stored as one JSON object per line
//!
//! Used for local runs without a database. Access is serialised through an
//! async mutex; unreadable lines are skipped rather than failing the read.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::QueryLog;
use crate::error::QueryLogError;
use crate::models::QueryLogEntry;

struct JsonlQueryLogInner {
  path: PathBuf,
}

#[derive(Clone)]
pub struct JsonlQueryLog {
  inner: Arc<Mutex<JsonlQueryLogInner>>,
}

impl JsonlQueryLogInner {
  fn new(path: &Path) -> std::io::Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
      File::create(path)?;
    }
    Ok(Self { path: path.to_path_buf() })
  }

  fn append(&mut self, entry: &QueryLogEntry) -> Result<(), QueryLogError> {
    let line = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
    writeln!(file, "{line}")?;
    file.flush()?;
    Ok(())
  }

  /// All readable entries in file order
  fn read_all(&self) -> Result<Vec<QueryLogEntry>, QueryLogError> {
    if !self.path.exists() {
      return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(&self.path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
      let line = line?;
      if line.trim().is_empty() {
        continue;
      }
      match serde_json::from_str::<QueryLogEntry>(&line) {
        Ok(entry) => entries.push(entry),
        Err(e) => debug!(error = %e, "skipping malformed query log line"),
      }
    }
    Ok(entries)
  }

  /// Replace the log contents. Entries go to a sibling file first, which is
  /// then renamed over the log so a failed write leaves the old log intact.
  fn rewrite(&mut self, entries: &[QueryLogEntry]) -> Result<(), QueryLogError> {
    let staging = staging_path(&self.path);
    if let Err(e) = write_entries(&staging, entries) {
      let _ = std::fs::remove_file(&staging);
      return Err(e);
    }
    std::fs::rename(&staging, &self.path)?;
    Ok(())
  }
}

fn staging_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

fn write_entries(path: &Path, entries: &[QueryLogEntry]) -> Result<(), QueryLogError> {
  let mut file = File::create(path)?;
  for entry in entries {
    writeln!(file, "{}", serde_json::to_string(entry)?)?;
  }
  file.flush()?;
  file.sync_all()?;
  Ok(())
}

impl JsonlQueryLog {
  pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, QueryLogError> {
    let inner = JsonlQueryLogInner::new(path.as_ref())?;
    Ok(Self { inner: Arc::new(Mutex::new(inner)) })
  }

  pub async fn path(&self) -> PathBuf {
    self.inner.lock().await.path.clone()
  }
}

fn matches_user(entry: &QueryLogEntry, user_id: Option<&str>) -> bool {
  user_id.map_or(true, |user| entry.user_id.as_deref() == Some(user))
}

#[async_trait]
impl QueryLog for JsonlQueryLog {
  async fn record(&self, entry: &QueryLogEntry) -> Result<(), QueryLogError> {
    let mut guard = self.inner.lock().await;
    guard.append(entry)
  }

  async fn history(
    &self,
    limit: usize,
    user_id: Option<&str>,
  ) -> Result<Vec<QueryLogEntry>, QueryLogError> {
    let guard = self.inner.lock().await;
    let mut entries: Vec<_> =
      guard.read_all()?.into_iter().filter(|e| matches_user(e, user_id)).collect();

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries.truncate(limit);
    Ok(entries)
  }

  async fn clear(&self, user_id: Option<&str>) -> Result<usize, QueryLogError> {
    let mut guard = self.inner.lock().await;
    let entries = guard.read_all()?;
    let before = entries.len();
    let kept: Vec<_> = match user_id {
      Some(_) => entries.into_iter().filter(|e| !matches_user(e, user_id)).collect(),
      None => Vec::new(),
    };
    guard.rewrite(&kept)?;
    Ok(before - kept.len())
  }
}
